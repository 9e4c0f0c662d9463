//! Persistence collaborators.
//!
//! The delivery core only reads and writes entities through these traits.
//! `PgStore` backs them with PostgreSQL; `MemoryStore` keeps everything in
//! process memory for tests and local runs.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppResult;
use crate::models::{
    Conversation, Event, EventReminder, Message, NewMessage, NewNotification, NewReminder,
    Notification, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, identity: &str) -> AppResult<Option<UserProfile>>;

    /// Check `password` against the stored argon2 hash. Unknown users are `false`.
    async fn verify_credentials(&self, identity: &str, password: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait EventDirectory: Send + Sync {
    async fn find_event(&self, event_id: Uuid) -> AppResult<Option<Event>>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;

    /// Return the conversation for the ordered pair `(a, b)`, creating it if absent.
    /// Callers pass `a < b` (see `Conversation::ordered_pair`).
    async fn find_or_create_conversation(&self, a: &str, b: &str) -> AppResult<Conversation>;

    async fn list_conversations(&self, identity: &str) -> AppResult<Vec<Conversation>>;

    /// Move the cached last message forward to `(content, at)`.
    ///
    /// Returns `false` without writing when the cache already holds a message
    /// newer than `at`; the cache never moves backwards.
    async fn update_last_message(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, new: NewMessage) -> AppResult<Message>;

    /// Oldest first.
    async fn list_messages(&self, conversation_id: Uuid) -> AppResult<Vec<Message>>;

    /// Flip `seen` on messages not authored by `viewer`. Returns rows changed.
    async fn mark_seen(&self, conversation_id: Uuid, viewer: &str) -> AppResult<u64>;

    async fn count_unseen(&self, conversation_id: Uuid, viewer: &str) -> AppResult<i64>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification>;

    /// Returns `false` when no such notification belongs to `recipient`.
    async fn mark_read(&self, id: Uuid, recipient: &str) -> AppResult<bool>;

    async fn mark_all_read(&self, recipient: &str) -> AppResult<u64>;

    /// Newest first.
    async fn list_notifications(&self, recipient: &str, limit: i64)
        -> AppResult<Vec<Notification>>;

    async fn count_unread(&self, recipient: &str) -> AppResult<i64>;
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn insert_reminder(&self, new: NewReminder) -> AppResult<EventReminder>;

    /// Pending reminders whose `reminder_time` truncated to the minute equals `minute`.
    async fn find_due(&self, minute: DateTime<Utc>) -> AppResult<Vec<EventReminder>>;

    /// Flip `sent` once. Returns `false` if it was already sent or is unknown.
    async fn mark_sent(&self, id: Uuid) -> AppResult<bool>;
}

/// One handle per collaborator.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserDirectory>,
    pub events: Arc<dyn EventDirectory>,
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub reminders: Arc<dyn ReminderStore>,
}

impl Repositories {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            events: store.clone(),
            conversations: store.clone(),
            messages: store.clone(),
            notifications: store.clone(),
            reminders: store,
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            events: store.clone(),
            conversations: store.clone(),
            messages: store.clone(),
            notifications: store.clone(),
            reminders: store,
        }
    }
}
