//! Payment methods supported at checkout.
//!
//! The set is closed: the backend rejects anything outside it, and the
//! checkout flow branches on which follow-up a method requires after the
//! order is created.

use serde::{Deserialize, Serialize};

/// A payment method the shop accepts.
///
/// Wire values match the backend's choices (`COD`, `ESEWA`, `KHALTI`, `BANK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery - collected by the courier.
    #[default]
    Cod,
    /// eSewa wallet, paid by scanning a QR code.
    Esewa,
    /// Khalti hosted gateway.
    Khalti,
    /// Bank transfer, paid by scanning a QR code.
    Bank,
}

/// What the checkout flow must do after an order is created with a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFollowup {
    /// Nothing to collect up front - go straight to the confirmation view.
    Confirmation,
    /// Show the QR block and require a payment-receipt upload.
    QrReceipt,
    /// Request a gateway URL from the backend and navigate to it.
    GatewayRedirect,
}

impl PaymentMethod {
    /// The backend wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::Esewa => "ESEWA",
            Self::Khalti => "KHALTI",
            Self::Bank => "BANK",
        }
    }

    /// Human-readable label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::Esewa => "eSewa (Scan QR)",
            Self::Khalti => "Khalti (Secure Gateway)",
            Self::Bank => "Bank Transfer (Scan QR)",
        }
    }

    /// The follow-up step this method requires after order creation.
    #[must_use]
    pub const fn followup(self) -> PaymentFollowup {
        match self {
            Self::Cod => PaymentFollowup::Confirmation,
            Self::Esewa | Self::Bank => PaymentFollowup::QrReceipt,
            Self::Khalti => PaymentFollowup::GatewayRedirect,
        }
    }

    /// The key the QR metadata endpoint uses for this method, if it has one.
    #[must_use]
    pub const fn qr_key(self) -> Option<&'static str> {
        match self {
            Self::Esewa => Some("esewa"),
            Self::Bank => Some("bank"),
            Self::Cod | Self::Khalti => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::Cod),
            "ESEWA" => Ok(Self::Esewa),
            "KHALTI" => Ok(Self::Khalti),
            "BANK" => Ok(Self::Bank),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_wire_values_round_trip() {
        for method in [
            PaymentMethod::Cod,
            PaymentMethod::Esewa,
            PaymentMethod::Khalti,
            PaymentMethod::Bank,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            let parsed: PaymentMethod = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, method);
            assert_eq!(PaymentMethod::from_str(method.as_str()).unwrap(), method);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!(PaymentMethod::from_str("PAYPAL").is_err());
        assert!(PaymentMethod::from_str("esewa").is_err());
    }

    #[test]
    fn test_followup_branching() {
        assert_eq!(PaymentMethod::Cod.followup(), PaymentFollowup::Confirmation);
        assert_eq!(PaymentMethod::Esewa.followup(), PaymentFollowup::QrReceipt);
        assert_eq!(PaymentMethod::Bank.followup(), PaymentFollowup::QrReceipt);
        assert_eq!(
            PaymentMethod::Khalti.followup(),
            PaymentFollowup::GatewayRedirect
        );
    }

    #[test]
    fn test_qr_keys() {
        assert_eq!(PaymentMethod::Esewa.qr_key(), Some("esewa"));
        assert_eq!(PaymentMethod::Bank.qr_key(), Some("bank"));
        assert_eq!(PaymentMethod::Cod.qr_key(), None);
        assert_eq!(PaymentMethod::Khalti.qr_key(), None);
    }
}
