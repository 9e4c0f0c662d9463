pub mod conversations;
pub mod delivery;
pub mod notifications;
pub mod reminders;

pub use conversations::ConversationService;
pub use delivery::{validate_message_content, DeliveryDispatcher};
pub use notifications::NotificationInbox;
pub use reminders::ReminderService;
