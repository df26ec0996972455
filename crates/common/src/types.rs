use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a newtype over an integer primary key.
///
/// Storefront rows are keyed by database-assigned integers; wrapping them
/// keeps a SKU id from being passed where a user id is expected.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

integer_id!(
    /// Identifier of a storefront user (order owner).
    UserId
);
integer_id!(
    /// Identifier of a stock-keeping unit.
    SkuId
);
integer_id!(
    /// Identifier of the product a SKU belongs to.
    ProductId
);
integer_id!(
    /// Identifier of a shipping address.
    AddressId
);

/// Order number as issued at commit time.
///
/// Derived from the commit timestamp and the owner id, so it is textual
/// rather than numeric (`20190627091620000000001`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps an existing order number.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Correlation id for a single checkout attempt.
///
/// Attached to tracing spans so every log line of one attempt can be
/// grouped, including attempts that never produce an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Creates a new random attempt ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_id_new_creates_unique_ids() {
        let id1 = AttemptId::new();
        let id2 = AttemptId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn integer_ids_preserve_value() {
        let sku = SkuId::new(42);
        assert_eq!(sku.as_i64(), 42);
        assert_eq!(i64::from(sku), 42);
        assert_eq!(sku.to_string(), "42");
    }

    #[test]
    fn integer_ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId::new(7));
    }

    #[test]
    fn order_id_string_conversion() {
        let id = OrderId::new("20190627091620000000001");
        assert_eq!(id.as_str(), "20190627091620000000001");

        let id2: OrderId = "20190627091620000000002".into();
        assert_ne!(id, id2);
    }
}
