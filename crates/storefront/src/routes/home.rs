//! Home page route handler.
//!
//! The home page is the product grid: latest jerseys by default, filtered by
//! search text, league, or tag when the query string says so. Filtering and
//! ordering are entirely the backend's job - this handler just forwards the
//! parameters.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use jersey_empire_core::format_npr;

use crate::api::types::{Product, ProductQuery};
use crate::filters;
use crate::models::Identity;
use crate::state::AppState;

/// Filter chips shown above the grid.
const CHIPS: &[(&str, &str, &str)] = &[
    ("Premier League", "league", "premier-league"),
    ("La Liga", "league", "la-liga"),
    ("National Teams", "league", "national-teams"),
    ("Retro", "tag", "retro"),
    ("Kids", "tag", "kids"),
];

/// Query parameters accepted by the home page.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// Free-text search.
    pub q: Option<String>,
    pub league: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    pub ordering: Option<String>,
}

/// Product card data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub slug: String,
    pub title: String,
    pub price: String,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            slug: product.slug.clone(),
            title: product.title.clone(),
            price: format_npr(product.price),
            image_url: product.image_url.clone(),
        }
    }
}

/// A filter chip above the grid.
#[derive(Clone)]
pub struct ChipView {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub heading: String,
    pub subheading: String,
    pub chips: Vec<ChipView>,
    pub has_filters: bool,
    pub products: Vec<ProductCardView>,
    pub error: Option<String>,
    pub logged_in: bool,
}

/// Section heading for the current filters.
fn heading_for(query: &HomeQuery) -> String {
    if let Some(q) = query.q.as_deref().filter(|s| !s.is_empty()) {
        return format!("Search: \u{201c}{q}\u{201d}");
    }
    if let Some(league) = query.league.as_deref().filter(|s| !s.is_empty()) {
        return league.replace('-', " ");
    }
    if let Some(tag) = query.tag.as_deref().filter(|s| !s.is_empty()) {
        return tag.to_string();
    }
    "Latest Jerseys".to_string()
}

fn has_filters(query: &HomeQuery) -> bool {
    [&query.q, &query.league, &query.tag, &query.category]
        .iter()
        .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
}

fn chips_for(query: &HomeQuery) -> Vec<ChipView> {
    CHIPS
        .iter()
        .map(|(label, key, value)| {
            let active = match *key {
                "league" => query.league.as_deref() == Some(*value),
                "tag" => query.tag.as_deref() == Some(*value),
                _ => false,
            };
            ChipView {
                label: (*label).to_string(),
                href: format!("/?{key}={value}"),
                active,
            }
        })
        .collect()
}

/// Display the home page.
#[instrument(skip(state, identity))]
pub async fn home(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<HomeQuery>,
) -> impl IntoResponse {
    let backend_query = ProductQuery {
        search: query.q.clone().filter(|s| !s.is_empty()),
        league: query.league.clone().filter(|s| !s.is_empty()),
        tag: query.tag.clone().filter(|s| !s.is_empty()),
        category: query.category.clone().filter(|s| !s.is_empty()),
        ordering: query.ordering.clone().filter(|s| !s.is_empty()),
        ..ProductQuery::default()
    };

    let (products, error) = match state.api().list_products(&identity, &backend_query).await {
        Ok(products) => (products.iter().map(ProductCardView::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            (
                Vec::new(),
                Some("Could not load products. Please try again.".to_string()),
            )
        }
    };

    let filtered = has_filters(&query);
    HomeTemplate {
        heading: heading_for(&query),
        subheading: if filtered {
            "Results".to_string()
        } else {
            "Fresh drops and fan favourites\u{2014}handpicked for Nepal.".to_string()
        },
        chips: chips_for(&query),
        has_filters: filtered,
        products,
        error,
        logged_in: identity.is_authenticated(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_prefers_search_text() {
        let query = HomeQuery {
            q: Some("manchester".to_string()),
            league: Some("la-liga".to_string()),
            ..HomeQuery::default()
        };
        assert_eq!(heading_for(&query), "Search: \u{201c}manchester\u{201d}");
    }

    #[test]
    fn test_heading_humanizes_league_slug() {
        let query = HomeQuery {
            league: Some("premier-league".to_string()),
            ..HomeQuery::default()
        };
        assert_eq!(heading_for(&query), "premier league");
    }

    #[test]
    fn test_heading_default() {
        assert_eq!(heading_for(&HomeQuery::default()), "Latest Jerseys");
        assert!(!has_filters(&HomeQuery::default()));
    }

    #[test]
    fn test_active_chip_detection() {
        let query = HomeQuery {
            tag: Some("retro".to_string()),
            ..HomeQuery::default()
        };
        let chips = chips_for(&query);
        let retro = chips.iter().find(|c| c.label == "Retro").expect("chip");
        assert!(retro.active);
        assert!(chips.iter().filter(|c| c.active).count() == 1);
    }
}
