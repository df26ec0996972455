//! Catalog rows read by the checkout path.

use common::{AddressId, ProductId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::Money;

/// A purchasable stock-keeping unit as currently stored.
///
/// `stock` and `sales` are a point-in-time read; they may be stale the
/// moment they are returned and are only ever written back through a
/// compare-and-set on `stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub sales: u32,
}

impl Sku {
    /// Creates a SKU row.
    pub fn new(
        id: SkuId,
        product_id: ProductId,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id,
            product_id,
            name: name.into(),
            price,
            stock,
            sales: 0,
        }
    }

    /// Sets the sales counter.
    pub fn with_sales(mut self, sales: u32) -> Self {
        self.sales = sales;
        self
    }

    /// Returns true if `quantity` units can be taken from the current stock.
    pub fn can_supply(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// A shipping address owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub owner: UserId,
    pub receiver: String,
    pub place: String,
    pub mobile: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Address {
    /// Creates a live address.
    pub fn new(
        id: AddressId,
        owner: UserId,
        receiver: impl Into<String>,
        place: impl Into<String>,
        mobile: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner,
            receiver: receiver.into(),
            place: place.into(),
            mobile: mobile.into(),
            is_deleted: false,
        }
    }

    /// Returns true if the address may be shipped to on behalf of `user`.
    pub fn is_usable_by(&self, user: UserId) -> bool {
        self.owner == user && !self.is_deleted
    }
}
