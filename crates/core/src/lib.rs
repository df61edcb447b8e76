//! Jersey Empire Core - Shared types library.
//!
//! This crate provides common types used by the storefront:
//! newtype IDs for backend entities, money with NPR display formatting,
//! and the closed payment-method and order-status sets the backend speaks.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Everything
//! durable lives behind the backend API; these types merely give its wire
//! values a safe shape on this side.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
