//! Type-safe price representation using decimal arithmetic.
//!
//! The backend is the only party that ever computes money; this module only
//! carries its decimal values and renders them the way the shop displays
//! prices: whole rupees with thousands grouping, e.g. `NPR 3,000`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (rupees, not paisa).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A Nepalese rupee amount.
    #[must_use]
    pub const fn npr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::NPR)
    }

    /// Format for display, e.g. `NPR 3,000`.
    #[must_use]
    pub fn display(&self) -> String {
        match self.currency_code {
            CurrencyCode::NPR => format_npr(self.amount),
            other => format!("{} {}", other.code(), self.amount),
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    NPR,
    INR,
    USD,
}

impl CurrencyCode {
    /// The ISO code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NPR => "NPR",
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}

/// Format a rupee amount for display: no fraction digits, grouped thousands.
///
/// Matches the storefront's display convention (`NPR 3,000`). Halves round
/// away from zero, so `NPR 1,500.5` displays as `NPR 1,501`.
#[must_use]
pub fn format_npr(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    let digits = rounded.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    format!("NPR {sign}{grouped}")
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
    fn test_format_npr_groups_thousands() {
        assert_eq!(format_npr(dec("3000")), "NPR 3,000");
        assert_eq!(format_npr(dec("1234567")), "NPR 1,234,567");
    }

    #[test]
    fn test_format_npr_small_amounts() {
        assert_eq!(format_npr(dec("0")), "NPR 0");
        assert_eq!(format_npr(dec("999")), "NPR 999");
    }

    #[test]
    fn test_format_npr_drops_fraction_digits() {
        // Halves round away from zero, like the shop's price display
        assert_eq!(format_npr(dec("1500.50")), "NPR 1,501");
        assert_eq!(format_npr(dec("1500.49")), "NPR 1,500");
    }

    #[test]
    fn test_format_npr_negative() {
        assert_eq!(format_npr(dec("-2500")), "NPR -2,500");
    }

    #[test]
    fn test_money_display() {
        let price = Money::npr(dec("4500"));
        assert_eq!(price.display(), "NPR 4,500");

        let usd = Money::new(dec("19.99"), CurrencyCode::USD);
        assert_eq!(usd.display(), "USD 19.99");
    }
}
