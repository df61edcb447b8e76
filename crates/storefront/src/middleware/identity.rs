//! Identity extractor and auth-token session helpers.
//!
//! The [`Identity`] extractor is how every handler gets the client state the
//! backend needs: the anonymous session identifier and the optional auth
//! token. The identifier is generated lazily on first access (UUID v4) and
//! persisted in the session; once generated it is never regenerated by this
//! app, so the backend sees a stable anonymous cart across requests.

use axum::{extract::FromRequestParts, http::request::Parts};
use secrecy::SecretString;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{Identity, session_keys};

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            // No session layer on this route. The identity still works for
            // the duration of the request; it just won't persist.
            tracing::warn!("Identity extracted without a session layer");
            return Ok(Self::anonymous(Uuid::new_v4().to_string()));
        };

        let session_id = match session.get::<String>(session_keys::SESSION_ID).await {
            Ok(Some(id)) => id,
            _ => {
                let id = Uuid::new_v4().to_string();
                if let Err(e) = session.insert(session_keys::SESSION_ID, &id).await {
                    tracing::error!("Failed to persist session id: {e}");
                }
                id
            }
        };

        let token = session
            .get::<String>(session_keys::AUTH_TOKEN)
            .await
            .ok()
            .flatten()
            .map(SecretString::from);

        Ok(Self::new(session_id, token))
    }
}

/// Persist the auth token after a successful login or signup.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_token(
    session: &Session,
    token: &str,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::AUTH_TOKEN, token).await
}

/// Remove the auth token (logout). The session identifier stays put.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_token(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<String>(session_keys::AUTH_TOKEN).await?;
    Ok(())
}
