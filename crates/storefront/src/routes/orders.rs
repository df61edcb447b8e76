//! Order confirmation route handler.
//!
//! The confirmation view is always a fresh fetch - the order id in the URL
//! is the only thing the flow carries forward, and status and totals come
//! from the backend every time (Khalti payers land here straight from the
//! gateway, so the status may have changed out-of-band).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use tracing::instrument;

use jersey_empire_core::{OrderId, format_npr};

use crate::api::types::Order;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::NotFoundTemplate;
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub title: String,
    pub size: String,
    pub unit_price: String,
    pub quantity: u32,
    /// Backend-provided line subtotal; absent when the backend omits it.
    pub line_total: Option<String>,
    pub image: Option<String>,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub status: String,
    /// Raw decimal total; the template formats it with the `npr` filter.
    pub total: Decimal,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            status: order.status.label().to_string(),
            total: order.total,
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    title: item
                        .product_title
                        .clone()
                        .unwrap_or_else(|| "Jersey".to_string()),
                    size: item
                        .variant_detail
                        .as_ref()
                        .map_or_else(|| "Free size".to_string(), |v| v.size.clone()),
                    unit_price: format_npr(item.price),
                    quantity: item.quantity,
                    line_total: item.sub_total.map(format_npr),
                    image: item.product_image.clone(),
                })
                .collect(),
        }
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/thank_you.html")]
pub struct ThankYouTemplate {
    pub order: Option<OrderView>,
    pub error: Option<String>,
    pub logged_in: bool,
}

/// Display the order confirmation view.
///
/// # Errors
///
/// This handler never fails the page: a missing order renders the inline
/// not-found view and any other fetch failure renders the confirmation
/// shell with a retry hint.
#[instrument(skip(state, identity))]
pub async fn thank_you(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(order_id): Path<i64>,
) -> Result<Response, AppError> {
    let order_id = OrderId::new(order_id);

    match state.api().get_order(&identity, order_id).await {
        Ok(order) => Ok(ThankYouTemplate {
            order: Some(OrderView::from(&order)),
            error: None,
            logged_in: true,
        }
        .into_response()),
        Err(e) if e.is_not_found() => Ok(NotFoundTemplate {
            heading: "Order not found".to_string(),
            message: "We could not find that order. Check the link from your confirmation."
                .to_string(),
            logged_in: true,
        }
        .into_response()),
        Err(e) => {
            tracing::warn!("Failed to fetch order {order_id}: {e}");
            Ok(ThankYouTemplate {
                order: None,
                error: Some(
                    "Could not load the order. If you just paid, please refresh in a moment."
                        .to_string(),
                ),
                logged_in: true,
            }
            .into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_view_from_backend_payload() {
        let json = r#"{
            "id": 41,
            "address": 2,
            "total": "4500.00",
            "status": "PAID",
            "created_at": "2025-11-02T10:00:00Z",
            "items": [{
                "id": 1,
                "variant": 9,
                "variant_detail": {"id": 9, "size": "M", "stock": 2},
                "price": "1500.00",
                "quantity": 2,
                "product_title": "Nepal Home",
                "sub_total": 3000.0
            }]
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        let view = OrderView::from(&order);

        assert_eq!(view.id, 41);
        assert_eq!(view.status, "Paid");
        assert_eq!(view.items[0].unit_price, "NPR 1,500");
        assert_eq!(view.items[0].line_total.as_deref(), Some("NPR 3,000"));
    }

    #[test]
    fn test_order_view_tolerates_sparse_items() {
        // Older backend revisions omit the presentation fields on items
        let json = r#"{
            "id": 7,
            "total": 800,
            "items": [{"id": 1, "variant": 3, "price": 800, "quantity": 1}]
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        let view = OrderView::from(&order);

        assert_eq!(view.status, "Pending");
        assert_eq!(view.items[0].title, "Jersey");
        assert_eq!(view.items[0].size, "Free size");
        assert_eq!(view.items[0].line_total, None);
    }
}
