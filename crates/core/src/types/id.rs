//! Newtype IDs for backend entity references.
//!
//! The commerce backend issues opaque, prefixed string identifiers
//! (`cart_01HZ...`, `prod_01HZ...`). Wrapping them keeps a cart ID from being
//! passed where a variant ID is expected.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `From<String>` and `From<&str>`
///
/// # Example
///
/// ```rust
/// # use vernont_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BinId);
///
/// let shelf = ShelfId::new("shelf_1");
/// assert_eq!(shelf.as_str(), "shelf_1");
///
/// // These are different types, so this won't compile:
/// // let _: BinId = shelf;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a backend identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id!(CartId);
define_id!(LineItemId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(CustomerId);
define_id!(AddressId);
define_id!(OrderId);
define_id!(ReturnId);
define_id!(ReviewId);
define_id!(ShippingOptionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = CartId::new("cart_01HZX");
        assert_eq!(id.as_str(), "cart_01HZX");
        assert_eq!(id.to_string(), "cart_01HZX");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ProductId::from("prod_123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"prod_123\"");

        let back: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_into_inner() {
        let id = OrderId::new(String::from("order_9"));
        assert_eq!(id.into_inner(), "order_9");
    }
}
