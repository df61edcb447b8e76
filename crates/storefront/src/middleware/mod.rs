//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Rate limiting on the auth routes (governor)

pub mod auth;
pub mod identity;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAuth, login_redirect_target, post_login_destination};
pub use identity::{clear_auth_token, set_auth_token};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
