use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum message length, counted in characters after trimming.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Direct conversation between exactly two identities.
///
/// Participants are stored ordered (`participant_a < participant_b`) so an
/// unordered pair maps to a single row. `last_message`/`last_message_time` are a
/// cache written after the message itself has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: String,
    pub participant_b: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Order a pair the way it is stored.
    pub fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn has_participant(&self, identity: &str) -> bool {
        self.participant_a == identity || self.participant_b == identity
    }

    /// The participant that is not `identity`, if `identity` takes part at all.
    pub fn other_participant(&self, identity: &str) -> Option<&str> {
        if self.participant_a == identity {
            Some(&self.participant_b)
        } else if self.participant_b == identity {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}

/// Message struct matching the persisted row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: String,
    pub content: String,
    pub seen: bool,
    pub sent_at: DateTime<Utc>,
}

/// Message as pushed on the `messages` destination. Keys match `NotificationPush`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePush {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: String,
    pub content: String,
    pub seen: bool,
    pub sent_at: DateTime<Utc>,
}

impl From<&Message> for MessagePush {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender: message.sender.clone(),
            content: message.content.clone(),
            seen: message.seen,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender: String,
    pub content: String,
}

/// Conversation as listed for one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_participant: String,
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            participant_a: "alice@campus.edu".into(),
            participant_b: "bob@campus.edu".into(),
            last_message: None,
            last_message_time: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ordered_pair_is_symmetric() {
        assert_eq!(
            Conversation::ordered_pair("bob@campus.edu", "alice@campus.edu"),
            Conversation::ordered_pair("alice@campus.edu", "bob@campus.edu")
        );
    }

    #[test]
    fn other_participant_resolves_both_sides() {
        let conv = conversation();
        assert_eq!(conv.other_participant("alice@campus.edu"), Some("bob@campus.edu"));
        assert_eq!(conv.other_participant("bob@campus.edu"), Some("alice@campus.edu"));
        assert_eq!(conv.other_participant("carol@campus.edu"), None);
        assert!(!conv.has_participant("carol@campus.edu"));
    }

    #[test]
    fn message_push_uses_camel_case_keys() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender: "alice@campus.edu".into(),
            content: "hi".into(),
            seen: false,
            sent_at: Utc::now(),
        };
        let json = serde_json::to_value(MessagePush::from(&message)).unwrap();
        assert_eq!(json["conversationId"], message.conversation_id.to_string());
        assert!(json.get("sentAt").is_some());
        assert!(json.get("sent_at").is_none());
    }
}
