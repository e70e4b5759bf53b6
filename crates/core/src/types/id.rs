//! Newtype IDs for type-safe entity references.
//!
//! The backend numbers every entity with an unsigned integer primary key.
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! passing a thread id where a post id is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `u64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `get()`
/// - `From<u64>`, `Into<u64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(OrderId);
/// define_id!(InvoiceId);
///
/// let order_id = OrderId::new(1);
/// let parsed: InvoiceId = "1".parse().unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = parsed;
/// assert_eq!(order_id.get(), parsed.get());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new ID from a u64 value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying u64 value.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Marketplace entities
define_id!(MemberId);
define_id!(SellerId);
define_id!(ProductId);
define_id!(PostId);
define_id!(CategoryId);
define_id!(ShopCategoryId);
define_id!(DiscountCodeId);
define_id!(ShopProfileId);

// Direct messaging
define_id!(ThreadId);
define_id!(MessageId);
define_id!(AttachmentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parses_trimmed_input() {
        let id: ThreadId = " 42 ".parse().unwrap();
        assert_eq!(id, ThreadId::new(42));
        assert!("abc".parse::<ThreadId>().is_err());
        assert!("-1".parse::<ThreadId>().is_err());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&PostId::new(7)).unwrap();
        assert_eq!(json, "7");

        let id: MemberId = serde_json::from_str("12").unwrap();
        assert_eq!(id.get(), 12);
        assert_eq!(id.to_string(), "12");
    }
}
