//! Delivery core against the in-memory store: persist first, push when online.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use realtime_delivery_service::{
    error::{AppError, AppResult},
    models::{Conversation, NotificationType, SYSTEM_SENDER},
    repository::{ConversationStore, MemoryStore, Repositories},
    services::DeliveryDispatcher,
    session::{PresenceOracle, SessionStore},
    state::AppState,
    websocket::{ConnectionRegistry, Destination},
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const ALICE: &str = "alice@campus.edu";
const BOB: &str = "bob@campus.edu";
const CAROL: &str = "carol@campus.edu";

async fn setup() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.add_user(ALICE, "Alice", "alice-password").await.unwrap();
    store.add_user(BOB, "Bob", "bob-password").await.unwrap();
    store.add_user(CAROL, "Carol", "carol-password").await.unwrap();
    let state = AppState::new(Repositories::in_memory(store.clone()), None);
    (state, store)
}

#[tokio::test]
async fn scenario_a_message_is_persisted_unseen_and_cached() {
    let (state, store) = setup().await;
    state.sessions.create_session(ALICE);

    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    let message = state
        .dispatcher
        .send_message(conversation.id, ALICE, "hi")
        .await
        .unwrap();

    assert_eq!(message.content, "hi");
    assert_eq!(message.sender, ALICE);
    assert!(!message.seen);

    let cached = store
        .find_conversation(conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.last_message.as_deref(), Some("hi"));
    assert_eq!(cached.last_message_time, Some(message.sent_at));
}

#[tokio::test]
async fn scenario_c_over_length_message_is_rejected_without_a_row() {
    let (state, store) = setup().await;
    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();

    let err = state
        .dispatcher
        .send_message(conversation.id, ALICE, &"x".repeat(501))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), "Message content cannot exceed 500 characters");
    assert_eq!(store.message_count().await, 0);

    let cached = store
        .find_conversation(conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.last_message, None);
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let (state, store) = setup().await;
    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();

    let err = state
        .dispatcher
        .send_message(conversation.id, ALICE, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Message content cannot be empty");
    assert_eq!(store.message_count().await, 0);
}

#[tokio::test]
async fn outsider_cannot_post_into_conversation() {
    let (state, store) = setup().await;
    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();

    let result = state
        .dispatcher
        .send_message(conversation.id, CAROL, "let me in")
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    let result = state
        .dispatcher
        .send_message(Uuid::new_v4(), ALICE, "hello?")
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(store.message_count().await, 0);
}

#[tokio::test]
async fn online_recipient_receives_full_message_on_message_channel() {
    let (state, _store) = setup().await;
    state.sessions.create_session(BOB);
    let (_id, mut rx) = state.registry.register(BOB).await;

    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    let message = state
        .dispatcher
        .send_message(conversation.id, ALICE, "  see you at 5  ")
        .await
        .unwrap();

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.destination, Destination::Messages);
    assert_eq!(frame.payload["id"], message.id.to_string());
    assert_eq!(frame.payload["content"], "see you at 5");
    assert_eq!(frame.payload["seen"], false);
    assert_eq!(frame.payload["conversationId"], conversation.id.to_string());
    assert!(frame.payload.get("sentAt").is_some());

    // Push does not count as a read receipt.
    assert_eq!(
        state.conversations.unread_count(conversation.id, BOB).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn offline_recipient_gets_no_push() {
    let (state, _store) = setup().await;
    // A registered channel without a session does not make the identity online.
    let (_id, mut rx) = state.registry.register(BOB).await;

    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    state
        .dispatcher
        .send_message(conversation.id, ALICE, "ping")
        .await
        .unwrap();

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn online_without_live_channel_is_not_an_error() {
    let (state, _store) = setup().await;
    state.sessions.create_session(BOB);

    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    let message = state
        .dispatcher
        .send_message(conversation.id, ALICE, "anyone there")
        .await
        .unwrap();
    assert_eq!(message.content, "anyone there");
}

#[tokio::test]
async fn get_or_create_is_idempotent_for_unordered_pair() {
    let (state, store) = setup().await;

    let first = state.conversations.get_or_create(BOB, ALICE).await.unwrap();
    let second = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.participant_a, ALICE);
    assert_eq!(store.conversation_count().await, 1);

    assert!(matches!(
        state.conversations.get_or_create(ALICE, ALICE).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        state.conversations.get_or_create(ALICE, "ghost@campus.edu").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn opening_marks_seen_only_while_viewer_is_online() {
    let (state, _store) = setup().await;
    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    for text in ["one", "two"] {
        state
            .dispatcher
            .send_message(conversation.id, ALICE, text)
            .await
            .unwrap();
    }
    state
        .dispatcher
        .send_message(conversation.id, BOB, "mine")
        .await
        .unwrap();

    // Offline viewer: log is returned, nothing is marked.
    let log = state.conversations.open(conversation.id, BOB).await.unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(
        state.conversations.unread_count(conversation.id, BOB).await.unwrap(),
        2
    );

    let token = state.sessions.create_session(BOB);
    let log = state.conversations.open(conversation.id, BOB).await.unwrap();
    assert!(log.iter().filter(|m| m.sender == ALICE).all(|m| m.seen));
    assert!(log.iter().filter(|m| m.sender == BOB).all(|m| !m.seen));
    assert_eq!(
        state.conversations.unread_count(conversation.id, BOB).await.unwrap(),
        0
    );

    // Alice's view is unaffected by Bob reading.
    assert_eq!(
        state.conversations.unread_count(conversation.id, ALICE).await.unwrap(),
        1
    );

    state.sessions.destroy_session(&token);
    assert!(matches!(
        state.conversations.open(conversation.id, CAROL).await,
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn conversation_list_is_ordered_by_latest_activity() {
    let (state, _store) = setup().await;
    let with_bob = state.conversations.get_or_create(ALICE, BOB).await.unwrap();
    let with_carol = state.conversations.get_or_create(ALICE, CAROL).await.unwrap();

    state
        .dispatcher
        .send_message(with_bob.id, BOB, "first")
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    state
        .dispatcher
        .send_message(with_carol.id, CAROL, "second")
        .await
        .unwrap();

    let summaries = state.conversations.list(ALICE).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].conversation.id, with_carol.id);
    assert_eq!(summaries[0].other_participant, CAROL);
    assert_eq!(summaries[0].unread_count, 1);
    assert_eq!(summaries[1].conversation.id, with_bob.id);
}

#[tokio::test]
async fn live_reminder_notification_is_marked_read_immediately() {
    let (state, store) = setup().await;
    state.sessions.create_session(BOB);
    let (_id, mut rx) = state.registry.register(BOB).await;
    let event_id = Uuid::new_v4();

    let notification = state
        .dispatcher
        .send_notification(
            BOB,
            SYSTEM_SENDER,
            NotificationType::EventReminder,
            "Reminder: \"Demo day\" starts in 1 hour",
            Some(event_id),
        )
        .await
        .unwrap();

    assert!(notification.read);
    assert!(store.find_notification(notification.id).await.unwrap().read);

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.destination, Destination::Notifications);
    assert_eq!(frame.payload["notificationId"], notification.id.to_string());
    assert_eq!(frame.payload["type"], "EVENT_REMINDER");
    assert_eq!(frame.payload["senderName"], "System");
    assert_eq!(frame.payload["senderEmail"], SYSTEM_SENDER);
    assert_eq!(frame.payload["referenceId"], event_id.to_string());
}

#[tokio::test]
async fn live_comment_notification_stays_unread_and_names_sender() {
    let (state, store) = setup().await;
    state.sessions.create_session(BOB);
    let (_id, mut rx) = state.registry.register(BOB).await;

    let notification = state
        .dispatcher
        .send_notification(BOB, ALICE, NotificationType::Comment, "nice post", None)
        .await
        .unwrap();

    assert!(!notification.read);
    assert!(!store.find_notification(notification.id).await.unwrap().read);
    assert_eq!(state.inbox.unread_count(BOB).await.unwrap(), 1);

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.payload["senderName"], "Alice");
    assert_eq!(frame.payload["senderEmail"], ALICE);
    assert!(frame.payload["referenceId"].is_null());
}

#[tokio::test]
async fn unknown_sender_falls_back_to_identity() {
    let (state, _store) = setup().await;
    state.sessions.create_session(BOB);
    let (_id, mut rx) = state.registry.register(BOB).await;

    state
        .dispatcher
        .send_notification(BOB, "former@campus.edu", NotificationType::Message, "hey", None)
        .await
        .unwrap();

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.payload["senderName"], "former@campus.edu");
}

#[tokio::test]
async fn offline_reminder_notification_waits_unread() {
    let (state, store) = setup().await;

    let notification = state
        .dispatcher
        .send_notification(
            BOB,
            SYSTEM_SENDER,
            NotificationType::EventReminder,
            "Reminder",
            Some(Uuid::new_v4()),
        )
        .await
        .unwrap();

    assert!(!notification.read);
    assert_eq!(store.notifications_for(BOB).await.len(), 1);
    assert_eq!(state.inbox.unread_count(BOB).await.unwrap(), 1);
}

#[tokio::test]
async fn inbox_mark_read_is_scoped_to_recipient() {
    let (state, _store) = setup().await;
    let first = state
        .inbox
        .create(ALICE, BOB, NotificationType::Comment, "first", None)
        .await
        .unwrap();
    state
        .inbox
        .create(ALICE, BOB, NotificationType::Comment, "second", None)
        .await
        .unwrap();

    assert!(matches!(
        state.inbox.mark_read(first.id, CAROL).await,
        Err(AppError::NotFound(_))
    ));
    state.inbox.mark_read(first.id, BOB).await.unwrap();
    assert_eq!(state.inbox.unread_count(BOB).await.unwrap(), 1);

    assert_eq!(state.inbox.mark_all_read(BOB).await.unwrap(), 1);
    assert_eq!(state.inbox.unread_count(BOB).await.unwrap(), 0);

    let listed = state.inbox.list(BOB, None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].content, "second");
}

#[tokio::test]
async fn clients_cannot_forge_reminders() {
    let (state, store) = setup().await;

    let result = state
        .inbox
        .create(ALICE, BOB, NotificationType::EventReminder, "fake", None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(store.notifications_for(BOB).await.is_empty());
}

/// Holds back the cache write for one message so it lands after a later one.
struct SlowCacheWrite {
    inner: Arc<MemoryStore>,
    delayed_content: &'static str,
}

#[async_trait]
impl ConversationStore for SlowCacheWrite {
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        self.inner.find_conversation(id).await
    }

    async fn find_or_create_conversation(&self, a: &str, b: &str) -> AppResult<Conversation> {
        self.inner.find_or_create_conversation(a, b).await
    }

    async fn list_conversations(&self, identity: &str) -> AppResult<Vec<Conversation>> {
        self.inner.list_conversations(identity).await
    }

    async fn update_last_message(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        if content == self.delayed_content {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.inner.update_last_message(id, content, at).await
    }
}

#[tokio::test]
async fn late_cache_write_does_not_roll_back_last_message() {
    let (state, store) = setup().await;
    let conversation = state.conversations.get_or_create(ALICE, BOB).await.unwrap();

    let mut repos = Repositories::in_memory(store.clone());
    repos.conversations = Arc::new(SlowCacheWrite {
        inner: store.clone(),
        delayed_content: "first",
    });
    let dispatcher = DeliveryDispatcher::new(
        repos,
        PresenceOracle::new(SessionStore::new()),
        ConnectionRegistry::new(),
    );

    let slow = {
        let dispatcher = dispatcher.clone();
        let id = conversation.id;
        tokio::spawn(async move { dispatcher.send_message(id, ALICE, "first").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = dispatcher
        .send_message(conversation.id, BOB, "second")
        .await
        .unwrap();
    slow.await.unwrap().unwrap();

    let cached = store
        .find_conversation(conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.last_message.as_deref(), Some("second"));
    assert_eq!(cached.last_message_time, Some(second.sent_at));
}
