//! Vernont Core - Shared domain types.
//!
//! Types used by the storefront binary and the operational CLI:
//! - string-backed ID newtypes for backend entities
//! - [`Email`] with structural validation and normalization
//! - [`Money`] and [`CurrencyCode`] in integer minor units
//! - order, payment, fulfillment and return status enums
//!
//! # Architecture
//!
//! The commerce backend owns every entity. This crate contains only types -
//! no I/O, no HTTP clients - so it can be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
