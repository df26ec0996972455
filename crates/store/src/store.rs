use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use common::{AddressId, OrderId, ProductId, SkuId, UserId};
use domain::{Address, Order, OrderHeader, OrderLine, OrderStatus, Sku};

use crate::{Result, StoreError};

/// A unit of work against the order and inventory tables.
///
/// Everything a checkout attempt writes goes through one transaction. Work
/// can be discarded back to a named savepoint; a transaction dropped
/// without `commit` is rolled back by the backend.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads the current SKU row. No lock is taken.
    async fn get_sku(&mut self, sku_id: SkuId) -> Result<Option<Sku>>;

    /// Writes `new_stock`/`new_sales` only if the stored stock still equals
    /// `expected_stock`.
    ///
    /// Returns the number of rows affected: 1 on success, 0 if another
    /// writer changed the stock since it was read.
    async fn compare_and_set_stock(
        &mut self,
        sku_id: SkuId,
        expected_stock: u32,
        new_stock: u32,
        new_sales: u32,
    ) -> Result<u64>;

    /// Increments the parent product's sales counter.
    async fn add_product_sales(&mut self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Inserts a new order header.
    async fn insert_order(&mut self, header: &OrderHeader) -> Result<()>;

    /// Inserts an order line.
    async fn insert_line(&mut self, line: &OrderLine) -> Result<()>;

    /// Persists `total_count` and `total_amount` of an inserted header.
    async fn update_order_totals(&mut self, header: &OrderHeader) -> Result<()>;

    /// Marks a point that later work can be rolled back to.
    async fn savepoint(&mut self, name: &str) -> Result<()>;

    /// Discards all work done since the savepoint. The savepoint remains.
    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()>;

    /// Forgets the savepoint, keeping the work done since it.
    async fn release_savepoint(&mut self, name: &str) -> Result<()>;

    /// Makes all work visible.
    async fn commit(self) -> Result<()>;

    /// Discards all work.
    async fn rollback(self) -> Result<()>;
}

/// Entry point for transactional checkout work.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    type Tx: StoreTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// Read-only catalog lookups outside any transaction.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the SKU row, or None if it does not exist.
    async fn get_sku(&self, sku_id: SkuId) -> Result<Option<Sku>>;
}

/// Shipping address lookups.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Returns the address only if it exists and belongs to `owner`.
    async fn get_address(&self, address_id: AddressId, owner: UserId) -> Result<Option<Address>>;
}

/// Result of recording a gateway trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRecord {
    /// The trade was new and is now recorded against the order.
    Recorded,
    /// The trade was already recorded against the same order.
    AlreadyRecorded,
    /// The trade id is already recorded against a different order.
    OtherOrder(OrderId),
}

impl PaymentRecord {
    /// Classifies a trade id that was already recorded under `existing`.
    pub fn existing(existing: &OrderId, order_id: &OrderId) -> Self {
        if existing == order_id {
            PaymentRecord::AlreadyRecorded
        } else {
            PaymentRecord::OtherOrder(existing.clone())
        }
    }
}

/// Queries and status updates on committed orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Loads a committed order owned by `owner`.
    async fn get_order(&self, order_id: &OrderId, owner: UserId) -> Result<Option<Order>>;

    /// Returns the current status of a committed order.
    async fn order_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>>;

    /// Records a gateway trade against an order.
    ///
    /// A trade id is recorded at most once; see [`PaymentRecord`].
    async fn record_payment(&self, order_id: &OrderId, trade_id: &str) -> Result<PaymentRecord>;

    /// Moves an order from `from` to `to` only if it is currently in `from`.
    ///
    /// Returns the number of rows affected.
    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<u64>;
}

/// Per-user cart cache: a hash of SKU → count plus a set of selected SKUs.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns every line in the user's cart.
    async fn get_cart_hash(&self, user: UserId) -> Result<HashMap<SkuId, u32>>;

    /// Returns the SKUs the user ticked for checkout.
    async fn get_selected_set(&self, user: UserId) -> Result<HashSet<SkuId>>;

    /// Deletes the given lines from the cart hash.
    async fn remove_lines(&self, user: UserId, sku_ids: &[SkuId]) -> Result<()>;

    /// Empties the selected set.
    async fn clear_selected(&self, user: UserId) -> Result<()>;
}

/// Checks that a savepoint name is safe to splice into SQL.
pub fn validate_savepoint_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSavepoint(name.to_string()))
    }
}
