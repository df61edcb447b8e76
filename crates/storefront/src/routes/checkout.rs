//! Checkout route handlers.
//!
//! The flow is a small state machine keyed by whether an order exists yet
//! and which payment method it was created with:
//!
//! 1. Pre-order: `GET /checkout` loads cart, addresses and QR metadata
//!    concurrently and picks a default address.
//! 2. Address creation (optional, repeatable): validated before any request;
//!    a failed submission re-renders with the input preserved.
//! 3. Order placement: refused with a clear message when the cart is empty
//!    or no address is selected - the order request is never sent. Success
//!    is a one-shot transition; a new order means starting from `/checkout`
//!    again.
//! 4. Order-created, branched by method: COD goes straight to confirmation;
//!    eSewa/Bank show the QR block and require a receipt upload; Khalti
//!    requests a gateway URL and navigates to it. The eSewa screen also
//!    offers the gateway's redirect-via-POST flow as a "pay online" option.
//!
//! Every failed mutation leaves the flow where it was, with a message, for
//! manual retry. Nothing is retried automatically and no idempotency key is
//! attached to order creation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use jersey_empire_core::{AddressId, OrderId, PaymentFollowup, PaymentMethod};

use crate::api::types::{Address, NewAddress, PaymentQrCodes, QrCodeInfo, ReceiptUpload};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Identity;
use crate::routes::cart::CartView;
use crate::state::AppState;

// =============================================================================
// View Models
// =============================================================================

/// Address display data for the selector.
#[derive(Clone)]
pub struct AddressView {
    pub id: i64,
    pub label: String,
    pub selected: bool,
}

/// Echoed address form input, so a failed submission loses nothing.
#[derive(Clone, Default)]
pub struct AddressFormView {
    pub full_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub street: String,
    pub landmark: String,
}

/// Payment method option for the radio list.
#[derive(Clone)]
pub struct PaymentOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
}

/// QR block display data.
#[derive(Clone)]
pub struct QrView {
    pub image_url: String,
    pub account_name: String,
    pub account_number: Option<String>,
    pub instructions: Option<String>,
}

impl From<&QrCodeInfo> for QrView {
    fn from(info: &QrCodeInfo) -> Self {
        Self {
            image_url: info.qr_code_url.clone(),
            account_name: info.account_name.clone(),
            account_number: info.account_number.clone(),
            instructions: info.instructions.clone(),
        }
    }
}

/// The payment options, in display order.
const PAYMENT_OPTIONS: &[PaymentOptionView] = &[
    PaymentOptionView {
        value: "COD",
        label: "Cash on Delivery",
        hint: "Pay when you receive your order",
    },
    PaymentOptionView {
        value: "ESEWA",
        label: "eSewa (Scan QR)",
        hint: "Scan QR & upload payment screenshot",
    },
    PaymentOptionView {
        value: "KHALTI",
        label: "Khalti (Secure Gateway)",
        hint: "Pay via Khalti payment gateway",
    },
    PaymentOptionView {
        value: "BANK",
        label: "Bank Transfer (Scan QR)",
        hint: "Scan bank QR & upload payment screenshot",
    },
];

// =============================================================================
// Forms & Queries
// =============================================================================

/// Query parameters for the checkout page.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutQuery {
    /// Address to preselect (set after creating one).
    pub selected: Option<i64>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// New address form data.
#[derive(Debug, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub landmark: String,
}

/// Place order form data.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    pub address: Option<i64>,
    pub payment_method: PaymentMethod,
}

/// Query parameters for the payment follow-up view.
#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub method: PaymentMethod,
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template (pre-order state).
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub addresses: Vec<AddressView>,
    pub has_selected_address: bool,
    pub form: AddressFormView,
    pub payment_options: &'static [PaymentOptionView],
    /// Methods whose QR block is not configured, so the option can say so.
    pub unavailable_qr: Vec<&'static str>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub logged_in: bool,
}

impl CheckoutTemplate {
    /// Whether a payment option's QR block is missing backend configuration.
    fn qr_unavailable(&self, value: &str) -> bool {
        self.unavailable_qr.iter().any(|method| *method == value)
    }
}

/// Payment follow-up template (order-created state, non-COD).
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub order_id: i64,
    pub method_value: &'static str,
    pub method_label: &'static str,
    pub requires_receipt: bool,
    pub is_khalti: bool,
    pub is_esewa: bool,
    pub qr: Option<QrView>,
    pub error: Option<String>,
    pub logged_in: bool,
}

/// Auto-submitting form page for the eSewa redirect-via-POST contract.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/esewa_redirect.html")]
pub struct EsewaRedirectTemplate {
    pub action: String,
    pub fields: Vec<(String, String)>,
    pub logged_in: bool,
}

// =============================================================================
// Pure helpers (the branching logic, kept testable)
// =============================================================================

/// Validate the address form before any request is made.
///
/// Required: full name, phone, province, city, street. Landmark is optional.
fn validate_address(form: &AddressForm) -> Result<NewAddress, String> {
    let required = [
        &form.full_name,
        &form.phone,
        &form.province,
        &form.city,
        &form.street,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err("Please fill Full Name, Phone, Province, City, and Street.".to_string());
    }

    let landmark = form.landmark.trim();
    Ok(NewAddress {
        full_name: form.full_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
        province: form.province.trim().to_string(),
        city: form.city.trim().to_string(),
        street: form.street.trim().to_string(),
        landmark: (!landmark.is_empty()).then(|| landmark.to_string()),
        is_default: true,
    })
}

/// Pick the address to preselect: the requested one if it exists, else the
/// user's default, else the first.
fn select_address(addresses: &[Address], requested: Option<AddressId>) -> Option<AddressId> {
    if let Some(id) = requested
        && addresses.iter().any(|a| a.id == id)
    {
        return Some(id);
    }
    addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
        .map(|a| a.id)
}

/// Where the browser goes right after an order is created.
///
/// COD is terminal; everything else lands on the payment follow-up view for
/// that method.
fn post_order_redirect(order_id: OrderId, method: PaymentMethod) -> String {
    match method.followup() {
        PaymentFollowup::Confirmation => format!("/orders/{order_id}/thank-you"),
        PaymentFollowup::QrReceipt | PaymentFollowup::GatewayRedirect => {
            format!("/checkout/orders/{order_id}/pay?method={method}")
        }
    }
}

/// Redirect back to checkout with an error message.
fn checkout_error_redirect(message: &str) -> String {
    format!("/checkout?error={}", urlencoding::encode(message))
}

/// Redirect back to a payment view with an error message.
fn payment_error_redirect(order_id: OrderId, method: PaymentMethod, message: &str) -> String {
    format!(
        "/checkout/orders/{order_id}/pay?method={method}&error={}",
        urlencoding::encode(message)
    )
}

/// QR methods the backend has no metadata for.
fn unavailable_qr_methods(qr_codes: &PaymentQrCodes) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if qr_codes.esewa.is_none() {
        missing.push(PaymentMethod::Esewa.as_str());
    }
    if qr_codes.bank.is_none() {
        missing.push(PaymentMethod::Bank.as_str());
    }
    missing
}

fn address_views(addresses: &[Address], selected: Option<AddressId>) -> Vec<AddressView> {
    addresses
        .iter()
        .map(|a| AddressView {
            id: a.id.as_i64(),
            label: format!("{} \u{2014} {}", a.full_name, a.city),
            selected: Some(a.id) == selected,
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page.
///
/// Loads the cart, the address book and the QR payment metadata
/// concurrently; the page renders once all three have settled.
///
/// # Errors
///
/// Returns `AppError` if any of the three fetches fail.
#[instrument(skip(state, identity))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Query(query): Query<CheckoutQuery>,
) -> Result<CheckoutTemplate, AppError> {
    let (cart, addresses, qr_codes) = fetch_checkout_data(&state, &identity).await?;

    let selected = select_address(&addresses, query.selected.map(AddressId::new));

    Ok(CheckoutTemplate {
        cart: CartView::from(&cart),
        addresses: address_views(&addresses, selected),
        has_selected_address: selected.is_some(),
        form: AddressFormView::default(),
        payment_options: PAYMENT_OPTIONS,
        unavailable_qr: unavailable_qr_methods(&qr_codes),
        error: query.error,
        notice: query.notice,
        logged_in: true,
    })
}

/// The three-way concurrent load for the pre-order state.
async fn fetch_checkout_data(
    state: &AppState,
    identity: &Identity,
) -> Result<(crate::api::types::Cart, Vec<Address>, PaymentQrCodes), AppError> {
    let (cart, addresses, qr_codes) = tokio::join!(
        state.api().get_cart(identity),
        state.api().list_addresses(identity),
        state.api().payment_qr_codes(identity),
    );
    Ok((cart?, addresses?, qr_codes?))
}

/// Create a delivery address.
///
/// Client-side validation runs before any request; a failure of either kind
/// re-renders the page with the submitted input intact so the user can fix
/// and retry.
///
/// # Errors
///
/// Returns `AppError` only if re-rendering the page itself fails.
#[instrument(skip(state, identity, form))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response, AppError> {
    let new_address = match validate_address(&form) {
        Ok(valid) => valid,
        Err(message) => {
            return Ok(rerender_with_form(&state, &identity, form, message).await?);
        }
    };

    match state.api().create_address(&identity, &new_address).await {
        Ok(created) => Ok(Redirect::to(&format!(
            "/checkout?selected={}&notice={}",
            created.id,
            urlencoding::encode("Address saved")
        ))
        .into_response()),
        Err(e) => {
            tracing::warn!("Failed to create address: {e}");
            Ok(rerender_with_form(
                &state,
                &identity,
                form,
                "Could not save address. Please try again.".to_string(),
            )
            .await?)
        }
    }
}

/// Re-render the checkout page with the address form input preserved.
async fn rerender_with_form(
    state: &AppState,
    identity: &Identity,
    form: AddressForm,
    error: String,
) -> Result<Response, AppError> {
    let (cart, addresses, qr_codes) = fetch_checkout_data(state, identity).await?;
    let selected = select_address(&addresses, None);

    Ok(CheckoutTemplate {
        cart: CartView::from(&cart),
        addresses: address_views(&addresses, selected),
        has_selected_address: selected.is_some(),
        form: AddressFormView {
            full_name: form.full_name,
            phone: form.phone,
            province: form.province,
            city: form.city,
            street: form.street,
            landmark: form.landmark,
        },
        payment_options: PAYMENT_OPTIONS,
        unavailable_qr: unavailable_qr_methods(&qr_codes),
        error: Some(error),
        notice: None,
        logged_in: true,
    }
    .into_response())
}

/// Place the order.
///
/// Empty cart and missing address are rejected here, before the order
/// request is ever sent. Success is the one-shot transition into the
/// order-created state for the chosen payment method.
///
/// # Errors
///
/// Returns `AppError` if the pre-placement cart fetch fails.
#[instrument(skip(state, identity))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Response, AppError> {
    let cart = state.api().get_cart(&identity).await?;
    if cart.is_empty() {
        return Ok(Redirect::to(&checkout_error_redirect("Your cart is empty.")).into_response());
    }

    let Some(address) = form.address.map(AddressId::new) else {
        return Ok(
            Redirect::to(&checkout_error_redirect("Select or create an address.")).into_response(),
        );
    };

    match state
        .api()
        .create_order(&identity, address, form.payment_method)
        .await
    {
        Ok(created) => Ok(Redirect::to(&post_order_redirect(
            created.order.id,
            form.payment_method,
        ))
        .into_response()),
        Err(e) => {
            tracing::warn!("Failed to create order: {e}");
            Ok(Redirect::to(&checkout_error_redirect(&e.user_message())).into_response())
        }
    }
}

/// Display the payment follow-up view for a created order.
///
/// QR methods show the scan block and the receipt form; Khalti shows the
/// gateway button. COD never lands here, but if it does, it is sent on to
/// the confirmation it was always going to reach.
///
/// # Errors
///
/// Returns `AppError` if the QR metadata fetch fails.
#[instrument(skip(state, identity))]
pub async fn payment(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(order_id): Path<i64>,
    Query(query): Query<PaymentQuery>,
) -> Result<Response, AppError> {
    let order_id = OrderId::new(order_id);
    let method = query.method;

    if method.followup() == PaymentFollowup::Confirmation {
        return Ok(Redirect::to(&format!("/orders/{order_id}/thank-you")).into_response());
    }

    let qr = if method.qr_key().is_some() {
        let qr_codes = state.api().payment_qr_codes(&identity).await?;
        qr_codes.for_method(method).map(QrView::from)
    } else {
        None
    };

    Ok(PaymentTemplate {
        order_id: order_id.as_i64(),
        method_value: method.as_str(),
        method_label: method.label(),
        requires_receipt: method.followup() == PaymentFollowup::QrReceipt,
        is_khalti: method == PaymentMethod::Khalti,
        is_esewa: method == PaymentMethod::Esewa,
        qr,
        error: query.error,
        logged_in: true,
    }
    .into_response())
}

/// Parsed receipt-upload form.
struct ReceiptForm {
    method: PaymentMethod,
    transaction_id: String,
    notes: String,
    file: Option<ReceiptFile>,
}

struct ReceiptFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Read the multipart receipt form field by field.
async fn read_receipt_form(mut multipart: Multipart) -> Result<ReceiptForm, AppError> {
    let mut form = ReceiptForm {
        method: PaymentMethod::Esewa,
        transaction_id: String::new(),
        notes: String::new(),
        file: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "method" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
                form.method = raw
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("Unknown payment method: {raw}")))?;
            }
            "transaction_id" => {
                form.transaction_id = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
            }
            "notes" => {
                form.notes = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
            }
            "payment_receipt" => {
                let name = field.file_name().unwrap_or("receipt").to_string();
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
                if !bytes.is_empty() {
                    form.file = Some(ReceiptFile {
                        name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Upload the payment receipt for a QR-paid order.
///
/// The receipt image is required; without it the payment view is shown
/// again with a message. Success completes the flow and navigates to the
/// confirmation view.
///
/// # Errors
///
/// Returns `AppError` if the multipart body is malformed.
#[instrument(skip(state, identity, multipart))]
pub async fn upload_receipt(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(order_id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let order_id = OrderId::new(order_id);
    let form = read_receipt_form(multipart).await?;

    let Some(file) = form.file else {
        return Ok(Redirect::to(&payment_error_redirect(
            order_id,
            form.method,
            "Please select payment receipt image.",
        ))
        .into_response());
    };

    let upload = ReceiptUpload {
        transaction_id: form.transaction_id,
        notes: form.notes,
        file_name: file.name,
        content_type: file.content_type,
        bytes: file.bytes,
    };

    match state
        .api()
        .upload_payment_receipt(&identity, order_id, upload)
        .await
    {
        Ok(()) => Ok(Redirect::to(&format!("/orders/{order_id}/thank-you")).into_response()),
        Err(e) => {
            tracing::warn!("Failed to upload receipt: {e}");
            Ok(Redirect::to(&payment_error_redirect(
                order_id,
                form.method,
                "Failed to upload receipt. Please try again.",
            ))
            .into_response())
        }
    }
}

/// Start a Khalti gateway payment: fetch the redirect URL and navigate to
/// it. Completion is determined out-of-band when the user lands back on the
/// confirmation route.
#[instrument(skip(state, identity))]
pub async fn khalti_pay(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(order_id): Path<i64>,
) -> Response {
    let order_id = OrderId::new(order_id);

    match state.api().khalti_initiate(&identity, order_id).await {
        Ok(initiate) => match initiate.payment_url {
            Some(url) => Redirect::to(&url).into_response(),
            None => Redirect::to(&payment_error_redirect(
                order_id,
                PaymentMethod::Khalti,
                "Khalti initiation failed.",
            ))
            .into_response(),
        },
        Err(e) => {
            tracing::warn!("Khalti initiation failed: {e}");
            Redirect::to(&payment_error_redirect(
                order_id,
                PaymentMethod::Khalti,
                "Khalti initiation failed.",
            ))
            .into_response()
        }
    }
}

/// Start an eSewa gateway payment.
///
/// eSewa requires a browser POST, so the backend's signed field map is
/// rendered as a hidden form that submits itself on load.
#[instrument(skip(state, identity))]
pub async fn esewa_pay(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(order_id): Path<i64>,
) -> Response {
    let order_id = OrderId::new(order_id);

    match state.api().esewa_initiate(&identity, order_id).await {
        Ok(form) => EsewaRedirectTemplate {
            action: form.action,
            fields: form.fields.into_iter().collect(),
            logged_in: true,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("eSewa initiation failed: {e}");
            Redirect::to(&payment_error_redirect(
                order_id,
                PaymentMethod::Esewa,
                "eSewa initiation failed.",
            ))
            .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address(id: i64, is_default: bool) -> Address {
        serde_json::from_str(&format!(
            r#"{{
                "id": {id},
                "full_name": "Sita Rai",
                "phone": "9841000000",
                "province": "Bagmati",
                "city": "Kathmandu",
                "street": "Thamel Marg",
                "is_default": {is_default}
            }}"#
        ))
        .unwrap()
    }

    fn full_form() -> AddressForm {
        AddressForm {
            full_name: "Sita Rai".to_string(),
            phone: "9841000000".to_string(),
            province: "Bagmati".to_string(),
            city: "Kathmandu".to_string(),
            street: "Thamel Marg".to_string(),
            landmark: String::new(),
        }
    }

    #[test]
    fn test_validate_address_requires_core_fields() {
        let mut form = full_form();
        form.city = "   ".to_string();
        let err = validate_address(&form).unwrap_err();
        assert!(err.contains("City"));
    }

    #[test]
    fn test_validate_address_landmark_optional() {
        let valid = validate_address(&full_form()).unwrap();
        assert_eq!(valid.landmark, None);

        let mut form = full_form();
        form.landmark = " Near Garden of Dreams ".to_string();
        let valid = validate_address(&form).unwrap();
        assert_eq!(valid.landmark.as_deref(), Some("Near Garden of Dreams"));
        assert!(valid.is_default);
    }

    #[test]
    fn test_select_address_prefers_requested_then_default_then_first() {
        let addresses = vec![address(1, false), address(2, true), address(3, false)];

        assert_eq!(
            select_address(&addresses, Some(AddressId::new(3))),
            Some(AddressId::new(3))
        );
        // Requested id not in the list: fall through to the default
        assert_eq!(
            select_address(&addresses, Some(AddressId::new(99))),
            Some(AddressId::new(2))
        );
        assert_eq!(select_address(&addresses, None), Some(AddressId::new(2)));

        let no_default = vec![address(5, false), address(6, false)];
        assert_eq!(select_address(&no_default, None), Some(AddressId::new(5)));

        assert_eq!(select_address(&[], None), None);
    }

    #[test]
    fn test_cod_goes_straight_to_confirmation() {
        assert_eq!(
            post_order_redirect(OrderId::new(41), PaymentMethod::Cod),
            "/orders/41/thank-you"
        );
    }

    #[test]
    fn test_qr_methods_land_on_payment_view() {
        assert_eq!(
            post_order_redirect(OrderId::new(41), PaymentMethod::Esewa),
            "/checkout/orders/41/pay?method=ESEWA"
        );
        assert_eq!(
            post_order_redirect(OrderId::new(41), PaymentMethod::Bank),
            "/checkout/orders/41/pay?method=BANK"
        );
        assert_eq!(
            post_order_redirect(OrderId::new(41), PaymentMethod::Khalti),
            "/checkout/orders/41/pay?method=KHALTI"
        );
    }

    #[test]
    fn test_unavailable_qr_methods() {
        let none: PaymentQrCodes = serde_json::from_str("{}").unwrap();
        assert_eq!(unavailable_qr_methods(&none), vec!["ESEWA", "BANK"]);

        let esewa_only: PaymentQrCodes = serde_json::from_str(
            r#"{"esewa": {"qr_code_url": "https://cdn.example/qr.png", "account_name": "Jersey Empire"}}"#,
        )
        .unwrap();
        assert_eq!(unavailable_qr_methods(&esewa_only), vec!["BANK"]);
    }

    #[test]
    fn test_error_redirects_are_encoded() {
        assert_eq!(
            checkout_error_redirect("Your cart is empty."),
            "/checkout?error=Your%20cart%20is%20empty."
        );
        assert_eq!(
            payment_error_redirect(
                OrderId::new(9),
                PaymentMethod::Esewa,
                "Please select payment receipt image."
            ),
            "/checkout/orders/9/pay?method=ESEWA&error=Please%20select%20payment%20receipt%20image."
        );
    }
}
