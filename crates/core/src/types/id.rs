//! Newtype IDs for type-safe entity references.
//!
//! The remote commerce API hands out opaque string identifiers. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing IDs
//! from different entity types.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use kiosk_core::define_id;
/// define_id!(WishlistId);
/// define_id!(ReviewId);
///
/// let wishlist_id = WishlistId::new("w-1");
/// let review_id = ReviewId::new("w-1");
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = review_id;
/// assert_eq!(wishlist_id.as_str(), review_id.as_str());
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
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
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

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(CartItemId);
define_id!(ShopId);
define_id!(PaymentReference);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let id = ProductId::new("64f1c0ffee");
        assert_eq!(id.to_string(), "64f1c0ffee");
        assert_eq!(String::from(id.clone()), "64f1c0ffee");
        assert_eq!(ProductId::from("64f1c0ffee"), id);
    }

    #[test]
    fn test_id_serde_transparent() {
        let shop = ShopId::new("shop-a");
        let json = serde_json::to_string(&shop).unwrap();
        assert_eq!(json, "\"shop-a\"");

        let parsed: ShopId = serde_json::from_str("\"shop-b\"").unwrap();
        assert_eq!(parsed.as_str(), "shop-b");
    }
}
