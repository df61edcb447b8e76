//! Session-stored state.
//!
//! The session is the durable client storage: it holds the anonymous cart
//! session identifier and the auth token. Both are opaque strings owned by
//! the backend; this app only carries them.

/// Session keys for client state.
pub mod keys {
    /// Key for the anonymous cart session identifier (UUID v4, generated
    /// once and never regenerated by this app).
    pub const SESSION_ID: &str = "session_id";

    /// Key for the backend auth token. Present means authenticated.
    pub const AUTH_TOKEN: &str = "auth_token";
}
