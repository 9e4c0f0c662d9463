use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender sentinel for notifications produced by the service itself.
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// New direct message
    Message,
    /// Upcoming event the user asked to be reminded of
    EventReminder,
    /// Comment on something the user follows
    Comment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Message => "MESSAGE",
            NotificationType::EventReminder => "EVENT_REMINDER",
            NotificationType::Comment => "COMMENT",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "MESSAGE" => Some(NotificationType::Message),
            "EVENT_REMINDER" => Some(NotificationType::EventReminder),
            "COMMENT" => Some(NotificationType::Comment),
            _ => None,
        }
    }

    /// A reminder that reached a live client does not stay in the unread backlog.
    pub fn read_on_live_delivery(&self) -> bool {
        matches!(self, NotificationType::EventReminder)
    }

    /// Only the reminder engine may emit `EVENT_REMINDER`.
    pub fn client_creatable(&self) -> bool {
        !matches!(self, NotificationType::EventReminder)
    }
}

/// Core notification model. Immutable except for `read` (false -> true only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: String,
    pub sender: String,
    pub notification_type: NotificationType,
    pub content: String,
    pub reference_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: String,
    pub sender: String,
    pub notification_type: NotificationType,
    pub content: String,
    pub reference_id: Option<Uuid>,
}

/// Payload pushed on the notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPush {
    pub notification_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub content: String,
    pub sender_name: String,
    pub sender_email: String,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl NotificationPush {
    pub fn new(notification: &Notification, sender_name: String) -> Self {
        Self {
            notification_id: notification.id,
            notification_type: notification.notification_type,
            content: notification.content.clone(),
            sender_name,
            sender_email: notification.sender.clone(),
            reference_id: notification.reference_id,
            created_at: notification.created_at,
        }
    }
}
