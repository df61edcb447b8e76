//! Product detail route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use jersey_empire_core::format_npr;

use crate::api::types::Product;
use crate::error::AppError;
use crate::filters;
use crate::models::Identity;
use crate::routes::NotFoundTemplate;
use crate::state::AppState;

/// Size option display data for templates.
#[derive(Clone)]
pub struct VariantView {
    pub id: i64,
    pub size: String,
    pub stock: u32,
    pub in_stock: bool,
}

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductDetailView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
    pub team_line: Option<String>,
    pub variants: Vec<VariantView>,
    pub any_in_stock: bool,
}

impl From<&Product> for ProductDetailView {
    fn from(product: &Product) -> Self {
        let variants: Vec<VariantView> = product
            .variants
            .iter()
            .map(|v| VariantView {
                id: v.id.as_i64(),
                size: v.size.clone(),
                stock: v.stock,
                in_stock: v.stock > 0,
            })
            .collect();
        let any_in_stock = variants.iter().any(|v| v.in_stock);

        // "Premier League · Arsenal" when the catalog has both
        let team_line = product.team.as_ref().map(|team| {
            team.league.as_ref().map_or_else(
                || team.name.clone(),
                |league| format!("{} \u{b7} {}", league.name, team.name),
            )
        });

        Self {
            title: product.title.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: format_npr(product.price),
            image_url: product.image_url.clone(),
            team_line,
            variants,
            any_in_stock,
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductDetailView,
    pub logged_in: bool,
}

/// Display the product detail page.
///
/// # Errors
///
/// Returns `AppError` if the backend is unreachable. A missing product is
/// not an error response - it renders the inline not-found view.
#[instrument(skip(state, identity))]
pub async fn show(
    State(state): State<AppState>,
    identity: Identity,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    match state.api().get_product(&identity, &slug).await {
        Ok(product) => Ok(ProductShowTemplate {
            product: ProductDetailView::from(&product),
            logged_in: identity.is_authenticated(),
        }
        .into_response()),
        Err(e) if e.is_not_found() => Ok(NotFoundTemplate {
            heading: "Product not found".to_string(),
            message: "That jersey is no longer listed. It may have sold out for the season."
                .to_string(),
            logged_in: identity.is_authenticated(),
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_view_from_product() {
        let json = r#"{
            "id": 4,
            "title": "Arsenal Home 24/25",
            "slug": "arsenal-home-24-25",
            "description": "Official shirt.",
            "price": "4500.00",
            "image_url": "https://cdn.example/arsenal.jpg",
            "team": {"id": 2, "name": "Arsenal", "league": {"id": 1, "name": "Premier League", "country": "England"}},
            "variants": [
                {"id": 10, "size": "M", "stock": 3, "sku": "ARS-H-M"},
                {"id": 11, "size": "L", "stock": 0, "sku": "ARS-H-L"}
            ]
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        let view = ProductDetailView::from(&product);

        assert_eq!(view.price, "NPR 4,500");
        assert_eq!(view.team_line.as_deref(), Some("Premier League \u{b7} Arsenal"));
        assert_eq!(view.variants.len(), 2);
        assert!(view.variants[0].in_stock);
        assert!(!view.variants[1].in_stock);
        assert!(view.any_in_stock);
    }

    #[test]
    fn test_detail_view_all_sold_out() {
        let json = r#"{
            "id": 4,
            "title": "Retro 1998",
            "slug": "retro-1998",
            "price": 5500,
            "variants": [{"id": 10, "size": "S", "stock": 0}]
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        let view = ProductDetailView::from(&product);
        assert!(!view.any_in_stock);
        assert!(view.team_line.is_none());
    }
}
