pub mod conversation;
pub mod notification;
pub mod reminder;
pub mod user;

pub use conversation::{
    Conversation, ConversationSummary, Message, MessagePush, NewMessage, MAX_MESSAGE_CHARS,
};
pub use notification::{NewNotification, Notification, NotificationPush, NotificationType, SYSTEM_SENDER};
pub use reminder::{truncate_to_minute, Event, EventReminder, NewReminder};
pub use user::UserProfile;
