//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;

use jersey_empire_core::format_npr;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a decimal amount as rupees, e.g. `NPR 3,000`.
///
/// Falls back to the raw value if it does not parse as a decimal.
///
/// Usage in templates: `{{ order.total|npr }}`
#[askama::filter_fn]
pub fn npr(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(Decimal::from_str(raw.trim()).map_or_else(|_| format!("NPR {raw}"), format_npr))
}
