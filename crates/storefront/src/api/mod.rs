//! Backend REST API client.
//!
//! # Architecture
//!
//! - The backend owns everything durable: catalog, carts, addresses, orders,
//!   payments. This module is the single point of HTTP egress to it.
//! - Every request carries `X-Session-Id` so the backend can find the
//!   anonymous cart; authenticated requests additionally carry
//!   `Authorization: Bearer <token>`. The login call itself goes through the
//!   same path, which is what lets the backend merge the anonymous cart into
//!   the user's cart at that moment.
//! - Responses are decoded into the closed record shapes in [`types`];
//!   anything that does not match is rejected here as a parse error rather
//!   than leaking half-typed data into the views.
//! - Nothing is cached and nothing is retried. A failed call surfaces as an
//!   error for the page that made it.
//!
//! # Example
//!
//! ```rust,ignore
//! use jersey_empire_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.backend);
//!
//! // Add to the anonymous cart and get the replacement snapshot back
//! let cart = client.add_to_cart(&identity, variant_id, 1).await?;
//! assert_eq!(cart.items.len(), 1);
//! ```

mod client;
pub mod types;

pub use client::ApiClient;

use thiserror::Error;

/// Errors that can occur when talking to the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection, timeout, etc).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// A message safe to show the user next to the action that failed.
    ///
    /// Backend `detail` strings are written for customers ("Only 2 left for
    /// Arsenal Home (M)"), so those pass through; everything else collapses
    /// to a generic retry message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { detail, .. } if !detail.is_empty() => detail.clone(),
            Self::NotFound(_) => "Not found.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether this error is a 404 / missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("/products/arsenal-home/".to_string());
        assert_eq!(err.to_string(), "Not found: /products/arsenal-home/");

        let err = ApiError::Backend {
            status: 400,
            detail: "Cart empty".to_string(),
        };
        assert_eq!(err.to_string(), "Backend error (400): Cart empty");
    }

    #[test]
    fn test_user_message_passes_backend_detail_through() {
        let err = ApiError::Backend {
            status: 400,
            detail: "Only 2 left for Arsenal Home (M)".to_string(),
        };
        assert_eq!(err.user_message(), "Only 2 left for Arsenal Home (M)");
    }

    #[test]
    fn test_user_message_is_generic_for_transport_errors() {
        let err = ApiError::Backend {
            status: 502,
            detail: String::new(),
        };
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }

    #[test]
    fn test_is_not_found() {
        assert!(ApiError::NotFound("x".to_string()).is_not_found());
        assert!(
            !ApiError::Backend {
                status: 400,
                detail: String::new()
            }
            .is_not_found()
        );
    }
}
