use super::{
    ConversationStore, EventDirectory, MessageStore, NotificationStore, ReminderStore,
    UserDirectory,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    truncate_to_minute, Conversation, Event, EventReminder, Message, NewMessage, NewNotification,
    NewReminder, Notification, NotificationType, UserProfile,
};
use crate::security::verify_password;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

/// PostgreSQL-backed store. One pool serves every collaborator trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conversation_from_row(row: &PgRow) -> Result<Conversation, sqlx::Error> {
    Ok(Conversation {
        id: row.try_get("id")?,
        participant_a: row.try_get("participant_a")?,
        participant_b: row.try_get("participant_b")?,
        last_message: row.try_get("last_message")?,
        last_message_time: row.try_get("last_message_time")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender: row.try_get("sender")?,
        content: row.try_get("content")?,
        seen: row.try_get("seen")?,
        sent_at: row.try_get("sent_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> AppResult<Notification> {
    let raw_type: String = row.try_get("notification_type")?;
    let notification_type = NotificationType::from_db(&raw_type)
        .ok_or_else(|| AppError::Database(format!("unknown notification type {raw_type}")))?;

    Ok(Notification {
        id: row.try_get("id")?,
        recipient: row.try_get("recipient")?,
        sender: row.try_get("sender")?,
        notification_type,
        content: row.try_get("content")?,
        reference_id: row.try_get("reference_id")?,
        read: row.try_get("read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn reminder_from_row(row: &PgRow) -> Result<EventReminder, sqlx::Error> {
    Ok(EventReminder {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        user_identity: row.try_get("user_identity")?,
        reminder_time: row.try_get("reminder_time")?,
        sent: row.try_get("sent")?,
    })
}

const CONVERSATION_COLUMNS: &str =
    "id, participant_a, participant_b, last_message, last_message_time, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender, content, seen, sent_at";
const NOTIFICATION_COLUMNS: &str =
    "id, recipient, sender, notification_type, content, reference_id, read, created_at";
const REMINDER_COLUMNS: &str = "id, event_id, user_identity, reminder_time, sent";

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user(&self, identity: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT email, display_name FROM users WHERE email = $1")
            .bind(identity)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(UserProfile {
                email: row.try_get("email")?,
                display_name: row.try_get("display_name")?,
            })
        })
        .transpose()
    }

    async fn verify_credentials(&self, identity: &str, password: &str) -> AppResult<bool> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE email = $1")
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;

        match hash {
            Some(hash) => verify_password(password, &hash),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl EventDirectory for PgStore {
    async fn find_event(&self, event_id: Uuid) -> AppResult<Option<Event>> {
        let row = sqlx::query("SELECT id, name, starts_at FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Event {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                starts_at: row.try_get("starts_at")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(conversation_from_row).transpose()?)
    }

    async fn find_or_create_conversation(&self, a: &str, b: &str) -> AppResult<Conversation> {
        // The unique (participant_a, participant_b) index settles concurrent creators.
        sqlx::query(
            r#"
            INSERT INTO conversations (id, participant_a, participant_b, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (participant_a, participant_b) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(a)
        .bind(b)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE participant_a = $1 AND participant_b = $2"
        ))
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        Ok(conversation_from_row(&row)?)
    }

    async fn list_conversations(&self, identity: &str) -> AppResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE participant_a = $1 OR participant_b = $1"
        ))
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(conversation_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_last_message(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET last_message = $2, last_message_time = $3
            WHERE id = $1 AND (last_message_time IS NULL OR last_message_time <= $3)
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Zero rows: either a newer message is cached or the conversation is gone.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(AppError::NotFound("conversation".into()));
        }
        Ok(false)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(&self, new: NewMessage) -> AppResult<Message> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages (id, conversation_id, sender, content, seen, sent_at) \
             VALUES ($1, $2, $3, $4, FALSE, NOW()) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.conversation_id)
        .bind(&new.sender)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message_from_row(&row)?)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY sent_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn mark_seen(&self, conversation_id: Uuid, viewer: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET seen = TRUE
            WHERE conversation_id = $1 AND sender <> $2 AND seen = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(viewer)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unseen(&self, conversation_id: Uuid, viewer: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender <> $2 AND seen = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification> {
        let row = sqlx::query(&format!(
            "INSERT INTO notifications \
             (id, recipient, sender, notification_type, content, reference_id, read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, NOW()) RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.recipient)
        .bind(&new.sender)
        .bind(new.notification_type.as_str())
        .bind(&new.content)
        .bind(new.reference_id)
        .fetch_one(&self.pool)
        .await?;

        notification_from_row(&row)
    }

    async fn mark_read(&self, id: Uuid, recipient: &str) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient = $2")
                .bind(id)
                .bind(recipient)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE recipient = $1 AND read = FALSE",
        )
        .bind(recipient)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_notifications(
        &self,
        recipient: &str,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient = $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(recipient)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn count_unread(&self, recipient: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient = $1 AND read = FALSE",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl ReminderStore for PgStore {
    async fn insert_reminder(&self, new: NewReminder) -> AppResult<EventReminder> {
        let row = sqlx::query(&format!(
            "INSERT INTO event_reminders (id, event_id, user_identity, reminder_time, sent) \
             VALUES ($1, $2, $3, $4, FALSE) RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.event_id)
        .bind(&new.user_identity)
        .bind(new.reminder_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(reminder_from_row(&row)?)
    }

    async fn find_due(&self, minute: DateTime<Utc>) -> AppResult<Vec<EventReminder>> {
        let rows = sqlx::query(&format!(
            "SELECT {REMINDER_COLUMNS} FROM event_reminders \
             WHERE sent = FALSE \
               AND reminder_time >= $1 AND reminder_time < $1 + INTERVAL '1 minute' \
             ORDER BY reminder_time ASC"
        ))
        .bind(truncate_to_minute(minute))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(reminder_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn mark_sent(&self, id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE event_reminders SET sent = TRUE WHERE id = $1 AND sent = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
