use crate::error::{AppError, AppResult};
use crate::models::{EventReminder, NewReminder};
use crate::repository::Repositories;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone)]
pub struct ReminderService {
    repos: Repositories,
}

impl ReminderService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Store a pending reminder for `user` about `event_id`.
    ///
    /// The engine only ever looks at the minute a reminder falls in, so a time
    /// in the past would never fire and is refused.
    pub async fn schedule(
        &self,
        user: &str,
        event_id: Uuid,
        reminder_time: DateTime<Utc>,
    ) -> AppResult<EventReminder> {
        self.schedule_at(user, event_id, reminder_time, Utc::now())
            .await
    }

    pub(crate) async fn schedule_at(
        &self,
        user: &str,
        event_id: Uuid,
        reminder_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<EventReminder> {
        if self.repos.events.find_event(event_id).await?.is_none() {
            return Err(AppError::NotFound("event".into()));
        }
        if reminder_time <= now {
            return Err(AppError::Validation(
                "Reminder time must be in the future".to_string(),
            ));
        }

        let reminder = self
            .repos
            .reminders
            .insert_reminder(NewReminder {
                event_id,
                user_identity: user.to_string(),
                reminder_time,
            })
            .await?;

        tracing::info!(
            reminder_id = %reminder.id,
            event_id = %event_id,
            user = %user,
            reminder_time = %reminder_time,
            "reminder scheduled"
        );
        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn past_reminder_time_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let event = store.add_event("Career fair", Utc::now() + Duration::days(2)).await;
        let service = ReminderService::new(Repositories::in_memory(store));

        let now = Utc::now();
        let result = service
            .schedule_at("u@campus.edu", event.id, now - Duration::minutes(1), now)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = ReminderService::new(Repositories::in_memory(store));

        let result = service
            .schedule("u@campus.edu", Uuid::new_v4(), Utc::now() + Duration::hours(1))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn scheduled_reminder_starts_pending() {
        let store = Arc::new(MemoryStore::new());
        let event = store.add_event("Hackathon", Utc::now() + Duration::days(1)).await;
        let service = ReminderService::new(Repositories::in_memory(store.clone()));

        let reminder = service
            .schedule("u@campus.edu", event.id, Utc::now() + Duration::hours(3))
            .await
            .unwrap();
        assert!(!reminder.sent);
        assert_eq!(store.find_reminder(reminder.id).await, Some(reminder));
    }
}
