use serde::{Deserialize, Serialize};

/// Public projection of a user, keyed by identity (email).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub display_name: String,
}
