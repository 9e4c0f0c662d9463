/// Frames written to a live push channel
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The three logical destinations every identity has.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Connect acknowledgement
    Connected,
    /// Chat messages
    Messages,
    /// Notifications
    Notifications,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Connected => "connected",
            Destination::Messages => "messages",
            Destination::Notifications => "notifications",
        }
    }
}

/// One pushed payload: a key/value map tagged with its destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushFrame {
    pub destination: Destination,
    pub payload: JsonValue,
}

impl PushFrame {
    pub fn new(destination: Destination, payload: JsonValue) -> Self {
        Self {
            destination,
            payload,
        }
    }

    /// Connect acknowledgement for `identity`
    pub fn connected(identity: &str) -> Self {
        Self::new(
            Destination::Connected,
            serde_json::json!({
                "identity": identity,
                "timestamp": chrono::Utc::now().timestamp(),
            }),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
