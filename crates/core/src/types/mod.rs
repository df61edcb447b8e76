//! Core types for Jersey Empire Nepal.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod payment;
pub mod price;
pub mod status;

pub use id::*;
pub use payment::{PaymentFollowup, PaymentMethod};
pub use price::{CurrencyCode, Money, format_npr};
pub use status::OrderStatus;
