use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub starts_at: DateTime<Utc>,
}

/// A reminder is `pending` until the engine flips `sent`, which never reverts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventReminder {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_identity: String,
    pub reminder_time: DateTime<Utc>,
    pub sent: bool,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub event_id: Uuid,
    pub user_identity: String,
    pub reminder_time: DateTime<Utc>,
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(t)
}
