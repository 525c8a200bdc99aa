//! Cache types for commerce API responses.

use vernont_core::CurrencyCode;

use super::types::{Product, ProductPage, ProductQuery, StoreSettings};

/// Cache key for read-mostly catalog data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Settings,
    Product {
        handle: String,
        currency: CurrencyCode,
    },
    Products(ProductQuery),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Settings(Box<StoreSettings>),
    Product(Box<Product>),
    Products(ProductPage),
}
