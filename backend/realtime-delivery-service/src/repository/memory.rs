use super::{
    ConversationStore, EventDirectory, MessageStore, NotificationStore, ReminderStore,
    UserDirectory,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    truncate_to_minute, Conversation, Event, EventReminder, Message, NewMessage, NewNotification,
    NewReminder, Notification, UserProfile,
};
use crate::security::{hash_password, verify_password};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct UserRecord {
    profile: UserProfile,
    password_hash: String,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, UserRecord>,
    events: HashMap<Uuid, Event>,
    conversations: HashMap<Uuid, Conversation>,
    /// Insertion order doubles as chronological order.
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    reminders: HashMap<Uuid, EventReminder>,
}

/// In-process implementation of every collaborator trait.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, email: &str, display_name: &str, password: &str) -> AppResult<()> {
        let password_hash = hash_password(password)?;
        self.state.write().await.users.insert(
            email.to_string(),
            UserRecord {
                profile: UserProfile {
                    email: email.to_string(),
                    display_name: display_name.to_string(),
                },
                password_hash,
            },
        );
        Ok(())
    }

    pub async fn add_event(&self, name: &str, starts_at: DateTime<Utc>) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            name: name.to_string(),
            starts_at,
        };
        self.state.write().await.events.insert(event.id, event.clone());
        event
    }

    pub async fn remove_event(&self, event_id: Uuid) {
        self.state.write().await.events.remove(&event_id);
    }

    pub async fn find_reminder(&self, id: Uuid) -> Option<EventReminder> {
        self.state.read().await.reminders.get(&id).cloned()
    }

    pub async fn find_notification(&self, id: Uuid) -> Option<Notification> {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub async fn notifications_for(&self, recipient: &str) -> Vec<Notification> {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }

    pub async fn conversation_count(&self) -> usize {
        self.state.read().await.conversations.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, identity: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .get(identity)
            .map(|u| u.profile.clone()))
    }

    async fn verify_credentials(&self, identity: &str, password: &str) -> AppResult<bool> {
        let hash = match self.state.read().await.users.get(identity) {
            Some(user) => user.password_hash.clone(),
            None => return Ok(false),
        };
        verify_password(password, &hash)
    }
}

#[async_trait]
impl EventDirectory for MemoryStore {
    async fn find_event(&self, event_id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.state.read().await.events.get(&event_id).cloned())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.state.read().await.conversations.get(&id).cloned())
    }

    async fn find_or_create_conversation(&self, a: &str, b: &str) -> AppResult<Conversation> {
        // Single write lock: lookup and insert cannot interleave.
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .conversations
            .values()
            .find(|c| c.participant_a == a && c.participant_b == b)
        {
            return Ok(existing.clone());
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            participant_a: a.to_string(),
            participant_b: b.to_string(),
            last_message: None,
            last_message_time: None,
            created_at: Utc::now(),
        };
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, identity: &str) -> AppResult<Vec<Conversation>> {
        Ok(self
            .state
            .read()
            .await
            .conversations
            .values()
            .filter(|c| c.has_participant(identity))
            .cloned()
            .collect())
    }

    async fn update_last_message(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("conversation".into()))?;
        if conversation.last_message_time.is_some_and(|cached| cached > at) {
            return Ok(false);
        }
        conversation.last_message = Some(content.to_string());
        conversation.last_message_time = Some(at);
        Ok(true)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, new: NewMessage) -> AppResult<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: new.conversation_id,
            sender: new.sender,
            content: new.content,
            seen: false,
            sent_at: Utc::now(),
        };
        self.state.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn mark_seen(&self, conversation_id: Uuid, viewer: &str) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id && m.sender != viewer && !m.seen)
        {
            message.seen = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn count_unseen(&self, conversation_id: Uuid, viewer: &str) -> AppResult<i64> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.sender != viewer && !m.seen)
            .count() as i64)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient: new.recipient,
            sender: new.sender,
            notification_type: new.notification_type,
            content: new.content,
            reference_id: new.reference_id,
            read: false,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn mark_read(&self, id: Uuid, recipient: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient == recipient)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, recipient: &str) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient == recipient && !n.read)
        {
            notification.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn list_notifications(
        &self,
        recipient: &str,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        Ok(self
            .state
            .read()
            .await
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient == recipient)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_unread(&self, recipient: &str) -> AppResult<i64> {
        Ok(self
            .state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.recipient == recipient && !n.read)
            .count() as i64)
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn insert_reminder(&self, new: NewReminder) -> AppResult<EventReminder> {
        let reminder = EventReminder {
            id: Uuid::new_v4(),
            event_id: new.event_id,
            user_identity: new.user_identity,
            reminder_time: new.reminder_time,
            sent: false,
        };
        self.state
            .write()
            .await
            .reminders
            .insert(reminder.id, reminder.clone());
        Ok(reminder)
    }

    async fn find_due(&self, minute: DateTime<Utc>) -> AppResult<Vec<EventReminder>> {
        let minute = truncate_to_minute(minute);
        let mut due: Vec<EventReminder> = self
            .state
            .read()
            .await
            .reminders
            .values()
            .filter(|r| !r.sent && truncate_to_minute(r.reminder_time) == minute)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.reminder_time);
        Ok(due)
    }

    async fn mark_sent(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.reminders.get_mut(&id) {
            Some(reminder) if !reminder.sent => {
                reminder.sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let first = store
            .find_or_create_conversation("a@campus.edu", "b@campus.edu")
            .await
            .unwrap();
        let second = store
            .find_or_create_conversation("a@campus.edu", "b@campus.edu")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.conversation_count().await, 1);
    }

    #[tokio::test]
    async fn last_message_cache_never_moves_backwards() {
        let store = MemoryStore::new();
        let conv = store
            .find_or_create_conversation("a@campus.edu", "b@campus.edu")
            .await
            .unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 5, 1, 10, 30, 0).unwrap();
        let later = earlier + chrono::Duration::seconds(1);

        assert!(store.update_last_message(conv.id, "second", later).await.unwrap());
        assert!(!store.update_last_message(conv.id, "first", earlier).await.unwrap());

        let cached = store.find_conversation(conv.id).await.unwrap().unwrap();
        assert_eq!(cached.last_message.as_deref(), Some("second"));
        assert_eq!(cached.last_message_time, Some(later));

        assert!(matches!(
            store.update_last_message(Uuid::new_v4(), "x", later).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn find_due_matches_on_minute_equality_only() {
        let store = MemoryStore::new();
        let minute = Utc.with_ymd_and_hms(2026, 5, 1, 10, 30, 0).unwrap();
        let event_id = Uuid::new_v4();

        for offset_secs in [0, 42, 60, -1] {
            store
                .insert_reminder(NewReminder {
                    event_id,
                    user_identity: "u@campus.edu".into(),
                    reminder_time: minute + chrono::Duration::seconds(offset_secs),
                })
                .await
                .unwrap();
        }

        let due = store.find_due(minute).await.unwrap();
        assert_eq!(due.len(), 2);
    }

    #[tokio::test]
    async fn mark_sent_flips_once() {
        let store = MemoryStore::new();
        let reminder = store
            .insert_reminder(NewReminder {
                event_id: Uuid::new_v4(),
                user_identity: "u@campus.edu".into(),
                reminder_time: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.mark_sent(reminder.id).await.unwrap());
        assert!(!store.mark_sent(reminder.id).await.unwrap());
        assert!(store.find_reminder(reminder.id).await.unwrap().sent);
    }

    #[tokio::test]
    async fn credentials_are_checked_against_hash() {
        let store = MemoryStore::new();
        store
            .add_user("u@campus.edu", "U", "s3cret-pass")
            .await
            .unwrap();

        assert!(store.verify_credentials("u@campus.edu", "s3cret-pass").await.unwrap());
        assert!(!store.verify_credentials("u@campus.edu", "wrong").await.unwrap());
        assert!(!store.verify_credentials("ghost@campus.edu", "s3cret-pass").await.unwrap());
    }
}
