//! Per-request client identity.
//!
//! Bundles the two pieces of client state the backend cares about: the
//! anonymous session identifier (always present) and the auth token
//! (present once logged in). The extractor in `middleware::identity`
//! produces one per request; the API client attaches both as headers.

use secrecy::SecretString;

/// The identity attached to every backend request.
#[derive(Debug, Clone)]
pub struct Identity {
    session_id: String,
    token: Option<SecretString>,
}

impl Identity {
    /// Create an identity with an optional auth token.
    #[must_use]
    pub const fn new(session_id: String, token: Option<SecretString>) -> Self {
        Self { session_id, token }
    }

    /// Create an anonymous identity (session id only).
    #[must_use]
    pub const fn anonymous(session_id: String) -> Self {
        Self {
            session_id,
            token: None,
        }
    }

    /// The anonymous session identifier. Always present.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The bearer token, if the user is logged in.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Whether a token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Drop the token, leaving the session identity intact.
    pub fn clear_token(&mut self) {
        self.token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous("sid-1".to_string());
        assert_eq!(identity.session_id(), "sid-1");
        assert!(!identity.is_authenticated());
    }

    #[test]
    fn test_clear_token_keeps_session_id() {
        let mut identity = Identity::new(
            "sid-1".to_string(),
            Some(SecretString::from("token")),
        );
        assert!(identity.is_authenticated());

        identity.clear_token();
        assert!(!identity.is_authenticated());
        assert_eq!(identity.session_id(), "sid-1");
    }
}
