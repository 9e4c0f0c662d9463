/// Delivery dispatcher
///
/// Both entry points follow the same shape:
/// 1. Persist the row (the durable copy is the source of truth)
/// 2. If the recipient is online, push it over the live channel
/// 3. Return the persisted row whatever the push outcome was
///
/// Push never blocks on the recipient and never retries; an offline or
/// unreachable recipient reads the row later through the ordinary read APIs.
use crate::error::{AppError, AppResult};
use crate::models::{
    Message, MessagePush, NewMessage, NewNotification, Notification, NotificationPush,
    NotificationType, MAX_MESSAGE_CHARS, SYSTEM_SENDER,
};
use crate::repository::Repositories;
use crate::session::PresenceOracle;
use crate::websocket::{ConnectionRegistry, Destination};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Display name pushed for notifications the service itself emits.
const SYSTEM_DISPLAY_NAME: &str = "System";

/// Trim `content` and enforce the 1..=500 character bound.
pub fn validate_message_content(content: &str) -> AppResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Message content cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message content cannot exceed {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct DeliveryDispatcher {
    repos: Repositories,
    presence: PresenceOracle,
    registry: ConnectionRegistry,
}

impl DeliveryDispatcher {
    pub fn new(repos: Repositories, presence: PresenceOracle, registry: ConnectionRegistry) -> Self {
        Self {
            repos,
            presence,
            registry,
        }
    }

    /// Persist a chat message and push it to the other participant if online.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender: &str,
        content: &str,
    ) -> AppResult<Message> {
        let content = validate_message_content(content)?;

        let conversation = self
            .repos
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("conversation".into()))?;
        let recipient = conversation
            .other_participant(sender)
            .ok_or(AppError::Forbidden)?
            .to_string();

        let message = self
            .repos
            .messages
            .insert_message(NewMessage {
                conversation_id,
                sender: sender.to_string(),
                content,
            })
            .await?;

        // Only after the message row exists. A newer message may already be cached.
        let advanced = self
            .repos
            .conversations
            .update_last_message(conversation_id, &message.content, message.sent_at)
            .await?;
        if !advanced {
            debug!(
                conversation_id = %conversation_id,
                message_id = %message.id,
                "conversation cache already holds a newer message"
            );
        }

        if self.presence.is_online(&recipient) {
            let payload = serde_json::to_value(MessagePush::from(&message))?;
            let delivered = self
                .registry
                .publish(&recipient, Destination::Messages, payload)
                .await;
            debug!(
                message_id = %message.id,
                recipient = %recipient,
                delivered,
                "message pushed"
            );
        }

        Ok(message)
    }

    /// Persist a notification and push it to the recipient if online.
    ///
    /// A reminder that is pushed live is marked read straight away and the
    /// returned row reflects that.
    pub async fn send_notification(
        &self,
        recipient: &str,
        sender: &str,
        notification_type: NotificationType,
        content: &str,
        reference_id: Option<Uuid>,
    ) -> AppResult<Notification> {
        let mut notification = self
            .repos
            .notifications
            .insert_notification(NewNotification {
                recipient: recipient.to_string(),
                sender: sender.to_string(),
                notification_type,
                content: content.to_string(),
                reference_id,
            })
            .await?;

        info!(
            notification_id = %notification.id,
            recipient = %recipient,
            notification_type = notification_type.as_str(),
            "notification stored"
        );

        if !self.presence.is_online(recipient) {
            return Ok(notification);
        }

        let sender_name = self.sender_display_name(sender).await;
        let payload = serde_json::to_value(NotificationPush::new(&notification, sender_name))?;
        let delivered = self
            .registry
            .publish(recipient, Destination::Notifications, payload)
            .await;
        debug!(
            notification_id = %notification.id,
            recipient = %recipient,
            delivered,
            "notification pushed"
        );

        if notification_type.read_on_live_delivery()
            && self
                .repos
                .notifications
                .mark_read(notification.id, recipient)
                .await?
        {
            notification.read = true;
        }

        Ok(notification)
    }

    async fn sender_display_name(&self, sender: &str) -> String {
        if sender == SYSTEM_SENDER {
            return SYSTEM_DISPLAY_NAME.to_string();
        }

        match self.repos.users.find_user(sender).await {
            Ok(Some(profile)) => profile.display_name,
            Ok(None) => {
                warn!(sender = %sender, "unknown notification sender, using identity as name");
                sender.to_string()
            }
            Err(e) => {
                warn!(sender = %sender, error = %e, "sender lookup failed, using identity as name");
                sender.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed_before_checks() {
        assert_eq!(validate_message_content("  hi \n").unwrap(), "hi");
        assert!(matches!(
            validate_message_content("   \t"),
            Err(AppError::Validation(msg)) if msg == "Message content cannot be empty"
        ));
    }

    #[test]
    fn length_bound_counts_characters() {
        assert!(validate_message_content(&"a".repeat(500)).is_ok());
        // 500 multi-byte characters is still within bounds.
        assert!(validate_message_content(&"é".repeat(500)).is_ok());

        let err = validate_message_content(&"a".repeat(501)).unwrap_err();
        assert_eq!(err.to_string(), "Message content cannot exceed 500 characters");
    }

    #[test]
    fn surrounding_whitespace_does_not_count_towards_limit() {
        let padded = format!("   {}   ", "a".repeat(500));
        assert!(validate_message_content(&padded).is_ok());
    }
}
