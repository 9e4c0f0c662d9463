/// Live push channels
///
/// 1. ConnectionRegistry: identity -> at most one live channel
/// 2. PushFrame: destination-tagged payloads written to the channel
/// 3. PushSession: the WebSocket actor draining a channel into its socket
pub mod frames;
pub mod session;

pub use frames::{Destination, PushFrame};
pub use session::PushSession;

use crate::metrics;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

/// Unique identifier for one registered connection
///
/// Lets a closing connection remove itself without evicting a newer
/// connection that replaced it for the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Channel {
    id: ConnectionId,
    sender: UnboundedSender<PushFrame>,
}

/// Connection registry for live push channels
///
/// Maps an identity to zero or one channel. Registering again replaces the
/// previous channel; dropping its sender ends the old connection's stream.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<String, Channel>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the live channel for `identity`
    ///
    /// Returns the connection id (for cleanup) and the receiving half that the
    /// connection drains.
    pub async fn register(&self, identity: &str) -> (ConnectionId, UnboundedReceiver<PushFrame>) {
        let (tx, rx) = unbounded_channel();
        let id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        let replaced = guard
            .insert(identity.to_string(), Channel { id, sender: tx })
            .is_some();
        metrics::set_live_connections(guard.len());

        tracing::debug!(
            identity = %identity,
            connection_id = ?id,
            replaced,
            "registered live channel"
        );

        (id, rx)
    }

    /// Remove the channel for `identity` if it is still `connection_id`
    pub async fn unregister(&self, identity: &str, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        if guard.get(identity).map(|c| c.id) == Some(connection_id) {
            guard.remove(identity);
            metrics::set_live_connections(guard.len());
            tracing::debug!(identity = %identity, connection_id = ?connection_id, "unregistered live channel");
        }
    }

    /// Fire-and-forget publish to `identity`
    ///
    /// Returns whether the frame was handed to a live channel. No channel is not
    /// an error: the recipient picks the persisted row up through read APIs.
    pub async fn publish(&self, identity: &str, destination: Destination, payload: JsonValue) -> bool {
        let frame = PushFrame::new(destination, payload);

        let dead = {
            let guard = self.inner.read().await;
            match guard.get(identity) {
                None => {
                    metrics::record_push(destination.as_str(), false);
                    return false;
                }
                Some(channel) => match channel.sender.send(frame) {
                    Ok(()) => {
                        metrics::record_push(destination.as_str(), true);
                        return true;
                    }
                    Err(_) => channel.id,
                },
            }
        };

        // Receiver is gone but the connection has not unregistered yet.
        metrics::record_push(destination.as_str(), false);
        self.unregister(identity, dead).await;
        false
    }

    pub async fn is_connected(&self, identity: &str) -> bool {
        self.inner.read().await.contains_key(identity)
    }

    /// Get the number of registered channels
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Clear all channels (shutdown)
    pub async fn clear_all(&self) {
        let mut guard = self.inner.write().await;
        guard.clear();
        metrics::set_live_connections(0);
    }
}
