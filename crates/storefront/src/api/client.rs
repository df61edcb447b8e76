//! Backend API client implementation.
//!
//! A thin, typed wrapper over `reqwest`. Every method threads the caller's
//! [`Identity`] through [`ApiClient::request`], which is the one place the
//! `X-Session-Id` and `Authorization` headers are attached.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use jersey_empire_core::{AddressId, CartItemId, OrderId, PaymentMethod, VariantId};

use crate::api::ApiError;
use crate::api::types::{
    AddToCartRequest, Address, Cart, CreateOrderRequest, CreatedOrder, KhaltiInitiate,
    LoginRequest, NewAddress, Order, PaymentQrCodes, PostRedirectForm, Product, ProductList,
    ProductQuery, ReceiptUpload, RegisterRequest, RegisteredUser, RemoveItemRequest, TokenPair,
    UpdateQuantityRequest,
};
use crate::config::BackendApiConfig;
use crate::models::Identity;

/// Header identifying the anonymous cart session on every request.
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Error body shape the backend uses for non-success responses.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: String,
}

/// Client for the shop backend REST API.
///
/// Cheap to clone; all methods take the per-request [`Identity`] explicitly
/// so there is no ambient auth state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new backend API client.
    #[must_use]
    pub fn new(config: &BackendApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        }
    }

    /// Build a request with the identity headers attached.
    ///
    /// `X-Session-Id` is always present; `Authorization: Bearer` only when
    /// the identity carries a token. All egress goes through here.
    fn request(&self, method: Method, path: &str, identity: &Identity) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(SESSION_ID_HEADER, identity.session_id());

        if let Some(token) = identity.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        builder
    }

    /// Send a request and decode the response body.
    async fn execute<T: DeserializeOwned>(
        &self,
        context: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let text = self.send(context, builder).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                context,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request, discarding the response body on success.
    async fn execute_unit(
        &self,
        context: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<(), ApiError> {
        self.send(context, builder).await.map(|_| ())
    }

    /// Send a request and return the raw body, mapping error statuses.
    async fn send(
        &self,
        context: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(context.to_string()));
        }

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.detail)
                .unwrap_or_default();
            tracing::warn!(status = %status, context, detail, "Backend returned non-success status");
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(text)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List products, optionally filtered by search/league/tag/etc.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity))]
    pub async fn list_products(
        &self,
        identity: &Identity,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, ApiError> {
        let builder = self
            .request(Method::GET, "/products/", identity)
            .query(query);
        let list: ProductList = self.execute("GET /products/", builder).await?;
        Ok(list.into_vec())
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self, identity), fields(slug = %slug))]
    pub async fn get_product(&self, identity: &Identity, slug: &str) -> Result<Product, ApiError> {
        let path = format!("/products/{slug}/");
        let builder = self.request(Method::GET, &path, identity);
        self.execute(&path, builder).await
    }

    // =========================================================================
    // Cart (every mutation returns the full replacement snapshot)
    // =========================================================================

    /// Fetch the current cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity))]
    pub async fn get_cart(&self, identity: &Identity) -> Result<Cart, ApiError> {
        let builder = self.request(Method::GET, "/cart/", identity);
        self.execute("GET /cart/", builder).await
    }

    /// Add a variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, including the backend's
    /// stock-guard rejections.
    #[instrument(skip(self, identity), fields(variant = %variant))]
    pub async fn add_to_cart(
        &self,
        identity: &Identity,
        variant: VariantId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let builder = self
            .request(Method::POST, "/cart/add/", identity)
            .json(&AddToCartRequest { variant, quantity });
        self.execute("POST /cart/add/", builder).await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity), fields(item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        identity: &Identity,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let builder = self
            .request(Method::POST, "/cart/update-qty/", identity)
            .json(&UpdateQuantityRequest { item_id, quantity });
        self.execute("POST /cart/update-qty/", builder).await
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity), fields(item_id = %item_id))]
    pub async fn remove_from_cart(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<Cart, ApiError> {
        let builder = self
            .request(Method::POST, "/cart/remove/", identity)
            .json(&RemoveItemRequest { item_id });
        self.execute("POST /cart/remove/", builder).await
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// List the authenticated user's delivery addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity))]
    pub async fn list_addresses(&self, identity: &Identity) -> Result<Vec<Address>, ApiError> {
        let builder = self.request(Method::GET, "/addresses/", identity);
        self.execute("GET /addresses/", builder).await
    }

    /// Create a delivery address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity, address))]
    pub async fn create_address(
        &self,
        identity: &Identity,
        address: &NewAddress,
    ) -> Result<Address, ApiError> {
        let builder = self
            .request(Method::POST, "/addresses/", identity)
            .json(address);
        self.execute("POST /addresses/", builder).await
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Fetch QR payment metadata for the QR-based methods.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity))]
    pub async fn payment_qr_codes(&self, identity: &Identity) -> Result<PaymentQrCodes, ApiError> {
        let builder = self.request(Method::GET, "/payment-qr-codes/", identity);
        self.execute("GET /payment-qr-codes/", builder).await
    }

    /// Upload a payment receipt for a QR-paid order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity, upload), fields(order_id = %order_id))]
    pub async fn upload_payment_receipt(
        &self,
        identity: &Identity,
        order_id: OrderId,
        upload: ReceiptUpload,
    ) -> Result<(), ApiError> {
        let path = format!("/orders/{order_id}/upload-payment-receipt/");

        let mut part =
            reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = reqwest::multipart::Form::new()
            .text("transaction_id", upload.transaction_id)
            .text("notes", upload.notes)
            .part("payment_receipt", part);

        let builder = self.request(Method::POST, &path, identity).multipart(form);
        self.execute_unit(&path, builder).await
    }

    /// Request a Khalti gateway redirect URL for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity), fields(order_id = %order_id))]
    pub async fn khalti_initiate(
        &self,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<KhaltiInitiate, ApiError> {
        let path = format!("/payments/khalti/initiate/{order_id}/");
        let builder = self.request(Method::POST, &path, identity);
        self.execute(&path, builder).await
    }

    /// Request the signed eSewa form payload for an order.
    ///
    /// The result is a redirect-via-POST contract: the browser must submit
    /// the returned fields to the returned action URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity), fields(order_id = %order_id))]
    pub async fn esewa_initiate(
        &self,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<PostRedirectForm, ApiError> {
        let path = format!("/payments/esewa/initiate/{order_id}/");
        let builder = self.request(Method::POST, &path, identity);
        self.execute(&path, builder).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order from the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, including the backend's
    /// empty-cart and stock rejections.
    #[instrument(skip(self, identity), fields(address = %address, method = %payment_method))]
    pub async fn create_order(
        &self,
        identity: &Identity,
        address: AddressId,
        payment_method: PaymentMethod,
    ) -> Result<CreatedOrder, ApiError> {
        let builder = self
            .request(Method::POST, "/orders/", identity)
            .json(&CreateOrderRequest {
                address,
                payment_method,
            });
        self.execute("POST /orders/", builder).await
    }

    /// Fetch an order for the confirmation view.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self, identity), fields(order_id = %order_id))]
    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> Result<Order, ApiError> {
        let path = format!("/orders/{order_id}/");
        let builder = self.request(Method::GET, &path, identity);
        self.execute(&path, builder).await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a token pair.
    ///
    /// Carries the session header like every other call - the backend merges
    /// the anonymous cart into the user's cart during this request.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, identity, password), fields(username = %username))]
    pub async fn login(
        &self,
        identity: &Identity,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/token/", identity)
            .json(&LoginRequest { username, password });
        self.execute("POST /auth/token/", builder).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is taken or the request fails.
    #[instrument(skip(self, identity, password), fields(username = %username))]
    pub async fn register(
        &self,
        identity: &Identity,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<RegisteredUser, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/register/", identity)
            .json(&RegisterRequest {
                username,
                email,
                password,
            });
        self.execute("POST /auth/register/", builder).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_client() -> ApiClient {
        ApiClient::new(&BackendApiConfig {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_every_request_carries_session_header() {
        let client = test_client();
        let identity = Identity::anonymous("a1b2c3d4".to_string());

        let request = client
            .request(Method::GET, "/cart/", &identity)
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get(SESSION_ID_HEADER).unwrap(),
            "a1b2c3d4"
        );
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_authenticated_request_carries_bearer_token() {
        let client = test_client();
        let identity = Identity::new(
            "a1b2c3d4".to_string(),
            Some(SecretString::from("tok-123")),
        );

        let request = client
            .request(Method::POST, "/orders/", &identity)
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok-123"
        );
        assert_eq!(
            request.headers().get(SESSION_ID_HEADER).unwrap(),
            "a1b2c3d4"
        );
    }

    #[test]
    fn test_cleared_token_no_longer_sent() {
        let client = test_client();
        let mut identity = Identity::new(
            "a1b2c3d4".to_string(),
            Some(SecretString::from("tok-123")),
        );
        identity.clear_token();

        let request = client
            .request(Method::GET, "/cart/", &identity)
            .build()
            .unwrap();

        assert!(request.headers().get("authorization").is_none());
        assert_eq!(
            request.headers().get(SESSION_ID_HEADER).unwrap(),
            "a1b2c3d4"
        );
    }

    #[test]
    fn test_request_url_joins_base_path() {
        let client = test_client();
        let identity = Identity::anonymous("sid".to_string());

        let request = client
            .request(Method::GET, "/products/arsenal-home/", &identity)
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://localhost:8000/api/products/arsenal-home/"
        );
    }
}
