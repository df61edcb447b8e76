//! Authentication route guard.
//!
//! Wraps protected pages: an unauthenticated visitor is redirected to the
//! login page with the originally requested path preserved in `next`, and
//! the login handler sends them back there after a successful sign-in.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use crate::models::Identity;

/// Default destination after login when no `next` was recorded.
///
/// Checkout is where an anonymous shopper most often hits the guard.
pub const DEFAULT_POST_LOGIN_PATH: &str = "/checkout";

/// Extractor that requires an authenticated identity.
///
/// If no auth token is present, the request is redirected to the login page
/// with the original path recorded.
///
/// # Example
///
/// ```rust,ignore
/// async fn checkout(RequireAuth(identity): RequireAuth) -> impl IntoResponse {
///     // identity.token() is guaranteed to be Some here
/// }
/// ```
pub struct RequireAuth(pub Identity);

/// Rejection that redirects to login, preserving the intended destination.
pub struct RedirectToLogin(String);

impl IntoResponse for RedirectToLogin {
    fn into_response(self) -> Response {
        Redirect::to(&login_redirect_target(&self.0)).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = RedirectToLogin;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped URI; the original one is in extensions
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let requested = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string);

        // Infallible
        let Ok(identity) = Identity::from_request_parts(parts, state).await;

        if identity.is_authenticated() {
            Ok(Self(identity))
        } else {
            Err(RedirectToLogin(requested))
        }
    }
}

/// Build the login URL that records the originally requested path.
#[must_use]
pub fn login_redirect_target(requested_path: &str) -> String {
    format!("/login?next={}", urlencoding::encode(requested_path))
}

/// Resolve where to send the user after a successful login.
///
/// Only same-site paths are honoured; anything else falls back to the
/// default so the `next` parameter cannot be used as an open redirect.
#[must_use]
pub fn post_login_destination(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => DEFAULT_POST_LOGIN_PATH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_preserves_path_and_query() {
        assert_eq!(
            login_redirect_target("/checkout"),
            "/login?next=%2Fcheckout"
        );
        assert_eq!(
            login_redirect_target("/orders/7/thank-you?paid=1"),
            "/login?next=%2Forders%2F7%2Fthank-you%3Fpaid%3D1"
        );
    }

    #[test]
    fn test_post_login_returns_to_recorded_path() {
        assert_eq!(post_login_destination(Some("/checkout")), "/checkout");
        assert_eq!(
            post_login_destination(Some("/orders/7/thank-you")),
            "/orders/7/thank-you"
        );
    }

    #[test]
    fn test_post_login_defaults_to_checkout() {
        assert_eq!(post_login_destination(None), "/checkout");
        assert_eq!(post_login_destination(Some("")), "/checkout");
    }

    #[test]
    fn test_post_login_rejects_offsite_redirects() {
        assert_eq!(
            post_login_destination(Some("https://evil.example")),
            "/checkout"
        );
        assert_eq!(post_login_destination(Some("//evil.example")), "/checkout");
    }
}
