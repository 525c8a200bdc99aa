//! Commerce backend REST client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for carts, pricing, inventory,
//!   orders and returns. Nothing is synced locally.
//! - Raw JSON is deserialized into [`dto`] shapes, then validated into the
//!   domain types in [`types`] by [`conversions`].
//! - Store settings, product pages and products by handle are cached with
//!   `moka` (5 minute TTL). Carts and customer data are never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! use vernont_storefront::api::CommerceClient;
//!
//! let client = CommerceClient::new(&config.commerce)?;
//!
//! let cart = client.create_cart(CurrencyCode::EUR).await?;
//! let cart = client.add_line_item(&cart.id, &variant_id, 1).await?;
//! ```

mod cache;
mod cart;
mod client;
pub mod conversions;
mod customers;
pub mod dto;
mod orders;
mod products;
mod returns;
mod reviews;
mod store;
pub mod types;

pub use client::CommerceClient;
pub use conversions::SchemaError;
pub use reviews::ReviewQuery;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The body parsed but violates the response schema.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, expired or revoked customer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status code.
        status: u16,
        /// Backend message or truncated body.
        message: String,
    },

    /// The client configuration is unusable (base URL or key).
    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// Whether the backend rejected the request itself (4xx other than auth
    /// and rate limiting), e.g. an unknown promo code or an invalid address.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status >= 400 && *status < 500)
    }

    /// Message safe to show next to a form when the backend rejected input.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { status, message } if (400..500).contains(status) => Some(message),
            _ => None,
        }
    }
}
