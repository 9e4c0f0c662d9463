use super::DeliveryDispatcher;
use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationType};
use crate::repository::Repositories;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Notification inbox of one recipient, plus the request-triggered create path.
#[derive(Clone)]
pub struct NotificationInbox {
    repos: Repositories,
    dispatcher: DeliveryDispatcher,
}

impl NotificationInbox {
    pub fn new(repos: Repositories, dispatcher: DeliveryDispatcher) -> Self {
        Self { repos, dispatcher }
    }

    /// Newest first. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list(&self, recipient: &str, limit: Option<i64>) -> AppResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self.repos
            .notifications
            .list_notifications(recipient, limit)
            .await
    }

    pub async fn unread_count(&self, recipient: &str) -> AppResult<i64> {
        self.repos.notifications.count_unread(recipient).await
    }

    pub async fn mark_read(&self, notification_id: Uuid, recipient: &str) -> AppResult<()> {
        if self
            .repos
            .notifications
            .mark_read(notification_id, recipient)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound("notification".into()))
        }
    }

    pub async fn mark_all_read(&self, recipient: &str) -> AppResult<u64> {
        let updated = self.repos.notifications.mark_all_read(recipient).await?;
        tracing::debug!(recipient = %recipient, updated, "notifications marked read");
        Ok(updated)
    }

    /// Notification raised by a user action (comment, message).
    ///
    /// `EVENT_REMINDER` belongs to the reminder engine and is refused here.
    pub async fn create(
        &self,
        sender: &str,
        recipient: &str,
        notification_type: NotificationType,
        content: &str,
        reference_id: Option<Uuid>,
    ) -> AppResult<Notification> {
        if !notification_type.client_creatable() {
            return Err(AppError::Validation(format!(
                "Notification type {} cannot be created directly",
                notification_type.as_str()
            )));
        }
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Notification content cannot be empty".to_string(),
            ));
        }
        if self.repos.users.find_user(recipient).await?.is_none() {
            return Err(AppError::NotFound("user".into()));
        }

        self.dispatcher
            .send_notification(recipient, sender, notification_type, content.trim(), reference_id)
            .await
    }
}
