//! Validation of backend wire shapes into storefront domain types.
//!
//! Conversions fail with [`SchemaError`] instead of silently clamping: a
//! negative quantity or an unknown currency means the backend and the
//! storefront disagree about the contract.

pub mod cart;
pub mod catalog;
pub mod orders;

pub use cart::{convert_cart, convert_completion, convert_shipping_option};
pub use catalog::{
    convert_product, convert_product_page, convert_review, convert_review_page,
    convert_store_settings,
};
pub use orders::{convert_order, convert_order_page, convert_return};

use thiserror::Error;
use vernont_core::{CurrencyCode, Money, MoneyError};

/// A backend response that parsed as JSON but violates the expected schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Unknown or unsupported currency code.
    #[error(transparent)]
    Currency(#[from] MoneyError),

    /// A count or quantity field is negative or out of range.
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Offending field.
        field: &'static str,
        /// Value as received.
        value: i64,
    },

    /// Review rating outside 1-5.
    #[error("rating must be between 1 and 5, got {0}")]
    Rating(i64),

    /// Rating distribution does not have one bucket per star.
    #[error("rating distribution must have 5 buckets, got {0}")]
    Distribution(usize),
}

/// Parse a wire currency code.
pub(crate) fn currency(code: &str) -> Result<CurrencyCode, SchemaError> {
    Ok(CurrencyCode::parse(code)?)
}

/// Validate a non-negative count that must fit in `u32`.
pub(crate) fn count(field: &'static str, value: i64) -> Result<u32, SchemaError> {
    u32::try_from(value).map_err(|_| SchemaError::OutOfRange { field, value })
}

/// Minor-unit amount in the given currency.
pub(crate) const fn money(amount: i64, currency: CurrencyCode) -> Money {
    Money::new(amount, currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rejects_negative() {
        assert_eq!(count("quantity", 3), Ok(3));
        assert_eq!(
            count("quantity", -1),
            Err(SchemaError::OutOfRange {
                field: "quantity",
                value: -1
            })
        );
        assert!(count("quantity", i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_currency_error_is_schema_error() {
        let err = currency("zzz").unwrap_err();
        assert_eq!(err.to_string(), "unsupported currency code: zzz");
    }
}
