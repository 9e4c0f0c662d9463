//! In-process session registry.
//!
//! Sessions live only in memory: they are created on login, removed on logout
//! and all of them disappear when the process restarts. There is no expiry.

pub mod presence;

pub use presence::PresenceOracle;

use crate::error::{AppError, AppResult};
use crate::metrics;
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;

/// Number of random bytes behind each token (hex-encoded on the wire).
const TOKEN_BYTES: usize = 32;

/// Process-wide `token -> identity` map.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh unguessable token bound to `identity`.
    ///
    /// An identity may hold any number of concurrent sessions.
    pub fn create_session(&self, identity: &str) -> String {
        let token = loop {
            let mut bytes = [0u8; TOKEN_BYTES];
            OsRng.fill_bytes(&mut bytes);
            let candidate = hex::encode(bytes);
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        self.sessions.insert(token.clone(), identity.to_string());
        metrics::set_sessions_active(self.sessions.len());
        tracing::debug!(identity = %identity, "session created");
        token
    }

    /// Resolve the identity bound to `token`.
    pub fn validate_session(&self, token: Option<&str>) -> AppResult<String> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::InvalidSession)?;

        self.sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(AppError::InvalidSession)
    }

    /// Revoke `token`. Unknown tokens are ignored.
    pub fn destroy_session(&self, token: &str) {
        if let Some((_, identity)) = self.sessions.remove(token) {
            metrics::set_sessions_active(self.sessions.len());
            tracing::debug!(identity = %identity, "session destroyed");
        }
    }

    /// True iff at least one session is bound to `identity`.
    ///
    /// Linear scan over the shards. A session inserted concurrently may be
    /// missed by an in-flight scan.
    pub fn has_session_for(&self, identity: &str) -> bool {
        self.sessions.iter().any(|entry| entry.value() == identity)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop every session (shutdown).
    pub fn clear(&self) {
        self.sessions.clear();
        metrics::set_sessions_active(0);
    }
}
