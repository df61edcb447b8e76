//! Authentication route handlers.
//!
//! Login and signup are thin proxies over the backend token endpoints. The
//! interesting part is the state they manage: a successful login stores the
//! bearer token in the session, and because the token request itself carries
//! the `X-Session-Id` header, the backend merges the anonymous cart into the
//! user's cart at that moment. The `next` parameter round-trips the guard's
//! recorded destination.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{clear_auth_token, post_login_destination, set_auth_token};
use crate::models::Identity;
use crate::state::AppState;

// =============================================================================
// Forms & Queries
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub next: String,
    pub error: Option<String>,
    pub logged_in: bool,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub username: String,
    pub email: String,
    pub error: Option<String>,
    pub logged_in: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page(
    identity: Identity,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        next: query.next.unwrap_or_default(),
        error: None,
        logged_in: identity.is_authenticated(),
    }
}

/// Handle login form submission.
///
/// On success the token is persisted in the session and the user is sent
/// back to where the guard caught them (checkout by default).
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    identity: Identity,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = form.next.clone().unwrap_or_default();

    if form.username.trim().is_empty() || form.password.is_empty() {
        return LoginTemplate {
            next,
            error: Some("Please enter both username and password.".to_string()),
            logged_in: false,
        }
        .into_response();
    }

    match state
        .api()
        .login(&identity, form.username.trim(), &form.password)
        .await
    {
        Ok(tokens) => {
            if let Err(e) = set_auth_token(&session, &tokens.access).await {
                tracing::error!("Failed to persist auth token: {e}");
                return LoginTemplate {
                    next,
                    error: Some("Session error. Please try again.".to_string()),
                    logged_in: false,
                }
                .into_response();
            }

            Redirect::to(&post_login_destination(form.next.as_deref())).into_response()
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            LoginTemplate {
                next,
                error: Some("Invalid credentials. Please try again.".to_string()),
                logged_in: false,
            }
            .into_response()
        }
    }
}

/// Display the signup page.
pub async fn signup_page(identity: Identity) -> impl IntoResponse {
    SignupTemplate {
        username: String::new(),
        email: String::new(),
        error: None,
        logged_in: identity.is_authenticated(),
    }
}

/// Handle signup form submission.
///
/// Registers the account, then logs straight in so the token is set the same
/// way a login sets it.
#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    identity: Identity,
    Form(form): Form<SignupForm>,
) -> Response {
    let error_page = |username: &str, email: &str, message: &str| {
        SignupTemplate {
            username: username.to_string(),
            email: email.to_string(),
            error: Some(message.to_string()),
            logged_in: false,
        }
        .into_response()
    };

    let username = form.username.trim();
    let email = form.email.trim();

    if username.is_empty() || email.is_empty() || form.password.is_empty() {
        return error_page(username, email, "Please fill all fields.");
    }
    if form.password != form.confirm {
        return error_page(username, email, "Passwords do not match.");
    }

    if let Err(e) = state
        .api()
        .register(&identity, username, Some(email), &form.password)
        .await
    {
        tracing::warn!("Signup failed: {e}");
        return error_page(username, email, "Signup failed. Try a different email/username.");
    }

    match state.api().login(&identity, username, &form.password).await {
        Ok(tokens) => {
            if let Err(e) = set_auth_token(&session, &tokens.access).await {
                tracing::error!("Failed to persist auth token after signup: {e}");
            }
            Redirect::to("/").into_response()
        }
        Err(e) => {
            // Account exists but the follow-up login failed; let them retry
            // on the login page rather than re-registering.
            tracing::warn!("Post-signup login failed: {e}");
            Redirect::to("/login").into_response()
        }
    }
}

/// Handle logout.
///
/// Clears the auth token only. The anonymous session identifier stays, so
/// the visitor keeps a stable cart identity.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_auth_token(&session).await {
        tracing::error!("Failed to clear auth token: {e}");
    }

    Redirect::to("/").into_response()
}
