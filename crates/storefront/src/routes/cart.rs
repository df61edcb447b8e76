//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The backend owns the cart; every mutation here returns the replacement
//! snapshot it sends back, and every figure on screen is formatted from the
//! server's numbers. Nothing is summed locally.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use jersey_empire_core::{CartItemId, VariantId, format_npr};

use crate::api::types::{Cart, CartItem};
use crate::filters;
use crate::models::Identity;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i64,
    pub slug: Option<String>,
    pub title: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: format_npr(Decimal::ZERO),
            item_count: 0,
        }
    }

    /// Whether there is anything in the cart.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Type Conversions
// =============================================================================

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            // Always the backend's total; never a sum over the lines
            total: format_npr(cart.cart_total.unwrap_or(Decimal::ZERO)),
            item_count: cart.items.iter().map(|item| item.quantity).sum(),
        }
    }
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.as_i64(),
            slug: item.product_slug.clone(),
            title: item.product_title.clone(),
            size: item
                .variant_detail
                .as_ref()
                .map_or_else(|| "Free size".to_string(), |v| v.size.clone()),
            quantity: item.quantity,
            unit_price: format_npr(item.product_price),
            line_total: format_npr(item.sub_total),
            image: item.product_image.clone(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant: i64,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: i64,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: i64,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub error: Option<String>,
    pub logged_in: bool,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Inline error fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/error.html")]
pub struct ErrorFragmentTemplate {
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, identity))]
pub async fn show(State(state): State<AppState>, identity: Identity) -> impl IntoResponse {
    let (cart, error) = match state.api().get_cart(&identity).await {
        Ok(cart) => (CartView::from(&cart), None),
        Err(e) => {
            tracing::warn!("Failed to fetch cart: {e}");
            (
                CartView::empty(),
                Some("Could not load your cart. Please try again.".to_string()),
            )
        }
    };

    CartShowTemplate {
        cart,
        error,
        logged_in: identity.is_authenticated(),
    }
}

/// Add item to cart (HTMX).
///
/// Returns the cart count badge plus an HTMX trigger so other fragments
/// refresh themselves.
#[instrument(skip(state, identity))]
pub async fn add(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let quantity = form.quantity.unwrap_or(1).max(1);

    match state
        .api()
        .add_to_cart(&identity, VariantId::new(form.variant), quantity)
        .await
    {
        Ok(cart) => {
            let view = CartView::from(&cart);
            (
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                CartCountTemplate {
                    count: view.item_count,
                },
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to add item to cart: {e}");
            (
                StatusCode::BAD_GATEWAY,
                ErrorFragmentTemplate {
                    message: e.user_message(),
                },
            )
                .into_response()
        }
    }
}

/// Update cart item quantity (HTMX).
#[instrument(skip(state, identity))]
pub async fn update(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let quantity = form.quantity.max(1);

    match state
        .api()
        .update_quantity(&identity, CartItemId::new(form.item_id), quantity)
        .await
    {
        Ok(cart) => items_fragment(&cart, None),
        Err(e) => {
            tracing::error!("Failed to update cart: {e}");
            stale_items_fragment(&state, &identity, e.user_message()).await
        }
    }
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, identity))]
pub async fn remove(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    match state
        .api()
        .remove_from_cart(&identity, CartItemId::new(form.item_id))
        .await
    {
        Ok(cart) => items_fragment(&cart, None),
        Err(e) => {
            tracing::error!("Failed to remove from cart: {e}");
            stale_items_fragment(&state, &identity, e.user_message()).await
        }
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, identity))]
pub async fn count(State(state): State<AppState>, identity: Identity) -> impl IntoResponse {
    let count = state
        .api()
        .get_cart(&identity)
        .await
        .map(|cart| CartView::from(&cart).item_count)
        .unwrap_or(0);

    CartCountTemplate { count }
}

/// Render the items fragment from a fresh snapshot.
fn items_fragment(cart: &Cart, error: Option<String>) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(cart),
            error,
        },
    )
        .into_response()
}

/// A mutation failed: re-fetch the last server state so the fragment shows
/// what is actually in the cart, with the error on top for manual retry.
async fn stale_items_fragment(state: &AppState, identity: &Identity, message: String) -> Response {
    let cart = state
        .api()
        .get_cart(identity)
        .await
        .as_ref()
        .map_or_else(|_| CartView::empty(), CartView::from);

    CartItemsTemplate {
        cart,
        error: Some(message),
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_view_uses_server_total_not_line_sum() {
        // The server is authoritative even when its total disagrees with
        // what summing the lines would give (discounts, stock rules).
        let json = r#"{
            "id": 1,
            "items": [{
                "id": 3,
                "variant": 9,
                "variant_detail": {"id": 9, "size": "M", "stock": 4},
                "quantity": 2,
                "product_title": "Arsenal Home 24/25",
                "product_price": "1500.00",
                "sub_total": "3000.00"
            }],
            "cart_total": 2800
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        let view = CartView::from(&cart);

        assert_eq!(view.total, "NPR 2,800");
        assert_eq!(view.items[0].line_total, "NPR 3,000");
        assert_eq!(view.items[0].unit_price, "NPR 1,500");
    }

    #[test]
    fn test_quantity_two_at_1500_displays_server_subtotal() {
        let json = r#"{
            "id": 1,
            "items": [{
                "id": 1,
                "variant": 2,
                "quantity": 2,
                "product_title": "Nepal Home",
                "product_price": "1500.00",
                "sub_total": 3000.0
            }],
            "cart_total": 3000.0
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        let view = CartView::from(&cart);

        assert_eq!(view.items[0].line_total, "NPR 3,000");
        assert_eq!(view.total, "NPR 3,000");
        assert_eq!(view.item_count, 2);
    }

    #[test]
    fn test_missing_variant_detail_falls_back_to_free_size() {
        let json = r#"{
            "id": 1,
            "items": [{
                "id": 1,
                "variant": 2,
                "quantity": 1,
                "product_title": "Scarf",
                "product_price": 800,
                "sub_total": 800
            }]
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        let view = CartView::from(&cart);
        assert_eq!(view.items[0].size, "Free size");
        // No cart_total from the server: display zero rather than a local sum
        assert_eq!(view.total, "NPR 0");
    }

    #[test]
    fn test_empty_view() {
        let view = CartView::empty();
        assert!(view.is_empty());
        assert_eq!(view.total, "NPR 0");
        assert_eq!(view.item_count, 0);
    }
}
