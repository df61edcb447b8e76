//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Product grid (search/league/tag filters)
//! GET  /health                 - Health check (registered in main)
//! GET  /products/{slug}        - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count fragment, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout                        - Checkout page (cart + addresses + QR metadata)
//! POST /checkout/address                - Create delivery address
//! POST /checkout/order                  - Place order
//! GET  /checkout/orders/{id}/pay        - Payment follow-up (QR + receipt, or gateway)
//! POST /checkout/orders/{id}/receipt    - Upload payment receipt
//! POST /checkout/orders/{id}/khalti     - Khalti gateway redirect
//! POST /checkout/orders/{id}/esewa      - eSewa redirect-via-POST
//!
//! # Orders (requires auth)
//! GET  /orders/{id}/thank-you  - Order confirmation
//!
//! # Auth (rate limited)
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /signup                 - Signup page
//! POST /signup                 - Signup action
//! POST /logout                 - Logout action
//!
//! # Preferences
//! POST /theme                  - Toggle theme preference cookie
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;
pub mod theme;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    routing::{get, post},
};

use crate::filters;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Inline not-found view with a way back to the home page.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub heading: String,
    pub message: String,
    pub logged_in: bool,
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Receipt uploads may carry a phone screenshot; allow a bit over the 5MB
/// the form advertises.
const RECEIPT_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/address", post(checkout::create_address))
        .route("/order", post(checkout::place_order))
        .route("/orders/{id}/pay", get(checkout::payment))
        .route("/orders/{id}/receipt", post(checkout::upload_receipt))
        .route("/orders/{id}/khalti", post(checkout::khalti_pay))
        .route("/orders/{id}/esewa", post(checkout::esewa_pay))
        .layer(axum::extract::DefaultBodyLimit::max(RECEIPT_BODY_LIMIT))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Product grid doubles as the home page
        .route("/", get(home::home))
        .route("/products/{slug}", get(products::show))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout routes (each handler carries the auth guard)
        .nest("/checkout", checkout_routes())
        // Order confirmation
        .route("/orders/{id}/thank-you", get(orders::thank_you))
        // Auth routes
        .merge(auth_routes())
        // Theme preference
        .route("/theme", post(theme::toggle))
}
