pub mod session_auth;

pub use session_auth::{
    extract_session_token, AuthenticatedUser, SessionAuthMiddleware, SESSION_TOKEN_HEADER,
};
