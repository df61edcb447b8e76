//! Wire types for the backend REST API.
//!
//! These are closed record shapes: each entity the backend returns is
//! declared field-by-field, and a response that does not fit is rejected at
//! the client boundary instead of flowing untyped into the views.
//!
//! Money fields arrive inconsistently from the backend - decimal columns are
//! serialized as JSON strings, computed totals as JSON numbers - so all of
//! them decode through [`decimal_flexible`], which accepts both.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use jersey_empire_core::{
    AddressId, CartId, CartItemId, EntityId, OrderId, OrderStatus, PaymentMethod, ProductId,
    UserId, VariantId,
};

// =============================================================================
// Flexible decimal decoding
// =============================================================================

/// Deserializer for money fields that may be a JSON string or a JSON number.
pub(crate) mod decimal_flexible {
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;
    use serde::{Deserialize, Deserializer, de};
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Decimal::from_str(s.trim()).map_err(de::Error::custom),
            Raw::Number(n) => {
                Decimal::from_f64(n).ok_or_else(|| de::Error::custom("number out of decimal range"))
            }
        }
    }

    /// Variant for `Option<Decimal>` fields.
    pub mod option {
        use rust_decimal::Decimal;
        use serde::{Deserialize, Deserializer};

        #[derive(Deserialize)]
        struct Wrapper(#[serde(deserialize_with = "super::deserialize")] Decimal);

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A league a team plays in.
#[derive(Debug, Clone, Deserialize)]
pub struct League {
    pub id: EntityId,
    pub name: String,
    pub country: String,
}

/// A team a jersey belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: EntityId,
    pub name: String,
    pub league: Option<League>,
}

/// A product category.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
}

/// A purchasable size of a product, with its own stock.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub size: String,
    pub stock: u32,
    #[serde(default)]
    pub sku: Option<String>,
}

/// A product in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "decimal_flexible::deserialize")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// The product list endpoint returns either a plain array or a paginated
/// envelope, depending on backend pagination settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductList {
    Plain(Vec<Product>),
    Paginated { results: Vec<Product> },
}

impl ProductList {
    /// Flatten either shape into the product list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Product> {
        match self {
            Self::Plain(products) | Self::Paginated { results: products } => products,
        }
    }
}

/// Query parameters for the product list endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A line in the cart, as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub variant: VariantId,
    #[serde(default)]
    pub variant_detail: Option<Variant>,
    pub quantity: u32,
    pub product_title: String,
    #[serde(default)]
    pub product_slug: Option<String>,
    #[serde(deserialize_with = "decimal_flexible::deserialize")]
    pub product_price: Decimal,
    #[serde(default)]
    pub product_image: Option<String>,
    /// Line subtotal as computed by the backend. Never recomputed here.
    #[serde(deserialize_with = "decimal_flexible::deserialize")]
    pub sub_total: Decimal,
}

/// The cart snapshot. Replaced wholesale on every successful mutation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Cart total as computed by the backend. Never recomputed here.
    #[serde(default, deserialize_with = "decimal_flexible::option::deserialize")]
    pub cart_total: Option<Decimal>,
}

impl Cart {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Body for `POST /cart/add/`.
#[derive(Debug, Clone, Serialize)]
pub struct AddToCartRequest {
    pub variant: VariantId,
    pub quantity: u32,
}

/// Body for `POST /cart/update-qty/`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityRequest {
    pub item_id: CartItemId,
    pub quantity: u32,
}

/// Body for `POST /cart/remove/`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveItemRequest {
    pub item_id: CartItemId,
}

// =============================================================================
// Addresses
// =============================================================================

/// A delivery address owned by the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub full_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub street: String,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Body for `POST /addresses/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAddress {
    pub full_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub is_default: bool,
}

// =============================================================================
// Payment QR metadata
// =============================================================================

/// Display metadata for one QR payment method.
#[derive(Debug, Clone, Deserialize)]
pub struct QrCodeInfo {
    pub qr_code_url: String,
    pub account_name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// QR metadata keyed by method, from `GET /payment-qr-codes/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentQrCodes {
    #[serde(default)]
    pub esewa: Option<QrCodeInfo>,
    #[serde(default)]
    pub bank: Option<QrCodeInfo>,
}

impl PaymentQrCodes {
    /// The QR block for a payment method, if that method has one configured.
    #[must_use]
    pub const fn for_method(&self, method: PaymentMethod) -> Option<&QrCodeInfo> {
        match method {
            PaymentMethod::Esewa => self.esewa.as_ref(),
            PaymentMethod::Bank => self.bank.as_ref(),
            PaymentMethod::Cod | PaymentMethod::Khalti => None,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A line on a placed order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub id: EntityId,
    pub variant: VariantId,
    #[serde(default)]
    pub variant_detail: Option<Variant>,
    /// Unit price captured at order time, from the backend.
    #[serde(deserialize_with = "decimal_flexible::deserialize")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub product_image: Option<String>,
    /// Line subtotal when the backend includes it; never derived locally.
    #[serde(default, deserialize_with = "decimal_flexible::option::deserialize")]
    pub sub_total: Option<Decimal>,
}

/// An order, as returned by `GET /orders/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub address: Option<AddressId>,
    /// Order total as computed by the backend.
    #[serde(deserialize_with = "decimal_flexible::deserialize")]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Body for `POST /orders/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub address: AddressId,
    pub payment_method: PaymentMethod,
}

/// Envelope returned by `POST /orders/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub order: Order,
}

/// A payment receipt to forward to the backend as multipart form data.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub transaction_id: String,
    pub notes: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// =============================================================================
// Gateway payments
// =============================================================================

/// Response from `POST /payments/khalti/initiate/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct KhaltiInitiate {
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub pidx: Option<String>,
}

/// A redirect-via-POST contract: an action URL plus the exact field map to
/// submit to it. eSewa requires a browser POST, so this is rendered as a
/// hidden auto-submitting form rather than a `Location` header.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRedirectForm {
    #[serde(rename = "form_action")]
    pub action: String,
    pub fields: BTreeMap<String, String>,
}

// =============================================================================
// Auth
// =============================================================================

/// Body for `POST /auth/token/`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token pair returned by `POST /auth/token/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Body for `POST /auth/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub password: &'a str,
}

/// Response from `POST /auth/register/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    pub id: UserId,
    pub username: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_cart_decodes_string_and_number_money() {
        // product_price is a decimal column (string), sub_total and
        // cart_total are computed fields (numbers)
        let json = r#"{
            "id": 12,
            "items": [{
                "id": 3,
                "variant": 9,
                "variant_detail": {"id": 9, "size": "M", "stock": 4, "sku": "ARS-H-M"},
                "quantity": 2,
                "product_title": "Arsenal Home 24/25",
                "product_slug": "arsenal-home-24-25",
                "product_price": "1500.00",
                "sub_total": 3000.0
            }],
            "cart_total": 3000.0
        }"#;

        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.id, Some(CartId::new(12)));
        assert_eq!(cart.items.len(), 1);
        let item = &cart.items[0];
        assert_eq!(item.product_price, dec("1500.00"));
        assert_eq!(item.sub_total, dec("3000"));
        assert_eq!(cart.cart_total, Some(dec("3000")));
    }

    #[test]
    fn test_empty_cart_defaults() {
        // A brand-new guest cart may come back with nothing but an id
        let cart: Cart = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.cart_total, None);
    }

    #[test]
    fn test_product_list_plain_and_paginated() {
        let product = r#"{"id":1,"title":"Nepal Home","slug":"nepal-home","price":"2500.00"}"#;

        let plain: ProductList = serde_json::from_str(&format!("[{product}]")).unwrap();
        assert_eq!(plain.into_vec().len(), 1);

        let paginated: ProductList =
            serde_json::from_str(&format!(r#"{{"count":1,"results":[{product}]}}"#)).unwrap();
        let products = paginated.into_vec();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, dec("2500.00"));
        assert!(products[0].variants.is_empty());
    }

    #[test]
    fn test_cart_rejects_malformed_money() {
        let json = r#"{"id": 1, "items": [], "cart_total": "not-a-number"}"#;
        assert!(serde_json::from_str::<Cart>(json).is_err());
    }

    #[test]
    fn test_qr_codes_keyed_by_method() {
        let json = r#"{
            "esewa": {
                "qr_code_url": "https://cdn.example/qr/esewa.png",
                "account_name": "Jersey Empire Nepal",
                "account_number": "9800000001",
                "instructions": "Scan with the eSewa app"
            }
        }"#;
        let codes: PaymentQrCodes = serde_json::from_str(json).unwrap();
        assert!(codes.for_method(PaymentMethod::Esewa).is_some());
        assert!(codes.for_method(PaymentMethod::Bank).is_none());
        assert!(codes.for_method(PaymentMethod::Cod).is_none());
    }

    #[test]
    fn test_created_order_envelope() {
        let json = r#"{"order": {"id": 41, "address": 2, "total": "4500.00", "status": "PENDING", "items": []}}"#;
        let created: CreatedOrder = serde_json::from_str(json).unwrap();
        assert_eq!(created.order.id, OrderId::new(41));
        assert_eq!(created.order.total, dec("4500.00"));
        assert_eq!(created.order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_post_redirect_form_contract() {
        let json = r#"{
            "form_action": "https://rc-epay.esewa.com.np/api/epay/main/v2/form",
            "fields": {
                "amount": "4500",
                "total_amount": "4500",
                "transaction_uuid": "8f14e45fceea167a",
                "product_code": "EPAYTEST",
                "signature": "c2lnbmF0dXJl"
            }
        }"#;
        let form: PostRedirectForm = serde_json::from_str(json).unwrap();
        assert!(form.action.starts_with("https://"));
        assert_eq!(
            form.fields.get("transaction_uuid").map(String::as_str),
            Some("8f14e45fceea167a")
        );
    }

    #[test]
    fn test_khalti_initiate_tolerates_missing_url() {
        let full: KhaltiInitiate =
            serde_json::from_str(r#"{"payment_url": "https://pay.khalti.com/?pidx=abc", "pidx": "abc"}"#)
                .unwrap();
        assert!(full.payment_url.is_some());

        let empty: KhaltiInitiate = serde_json::from_str("{}").unwrap();
        assert!(empty.payment_url.is_none());
    }

    #[test]
    fn test_create_order_request_wire_shape() {
        let body = CreateOrderRequest {
            address: AddressId::new(5),
            payment_method: PaymentMethod::Esewa,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["address"], 5);
        assert_eq!(json["payment_method"], "ESEWA");
    }

    #[test]
    fn test_product_query_skips_empty_params() {
        let query = ProductQuery {
            search: Some("manchester".to_string()),
            ..ProductQuery::default()
        };
        let encoded = serde_json::to_value(&query).unwrap();
        assert_eq!(encoded.as_object().unwrap().len(), 1);
        assert_eq!(encoded["search"], "manchester");
    }
}
