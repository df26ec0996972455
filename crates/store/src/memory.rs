use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use common::{AddressId, OrderId, ProductId, SkuId, UserId};
use domain::{Address, Order, OrderHeader, OrderLine, OrderStatus, Sku};

use crate::{
    Result, StoreError,
    store::{
        AddressBook, Catalog, CheckoutStore, OrderRepository, PaymentRecord, StoreTransaction,
        validate_savepoint_name,
    },
};

#[derive(Debug, Default)]
struct Tables {
    skus: HashMap<SkuId, Sku>,
    product_sales: HashMap<ProductId, u64>,
    addresses: HashMap<AddressId, Address>,
    orders: HashMap<OrderId, OrderHeader>,
    lines: Vec<OrderLine>,
    payments: HashMap<String, OrderId>,
}

#[derive(Debug, Default)]
struct Faults {
    sku_read_delay: Option<Duration>,
    forced_cas_misses: u32,
    fail_on_insert_line: bool,
    fail_on_product_sales: bool,
}

/// In-memory store implementation for testing and simulation.
///
/// Stock writes from a transaction land in the shared SKU table as soon as
/// the compare-and-set succeeds, like a row update that other sessions can
/// race against. Each write is also logged as a delta so rollback can undo
/// exactly that transaction's contribution without clobbering concurrent
/// reservations on the same SKU. Orders and lines stay private to the
/// transaction until commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<RwLock<Faults>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> RwLockWriteGuard<'_, Faults> {
        self.faults.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a SKU row. The parent product is created on demand.
    pub fn insert_sku(&self, sku: Sku) {
        let mut tables = self.write();
        tables.product_sales.entry(sku.product_id).or_insert(0);
        tables.skus.insert(sku.id, sku);
    }

    /// Inserts or replaces an address.
    pub fn insert_address(&self, address: Address) {
        self.write().addresses.insert(address.id, address);
    }

    /// Returns the committed state of a SKU.
    pub fn sku(&self, sku_id: SkuId) -> Option<Sku> {
        self.read().skus.get(&sku_id).cloned()
    }

    /// Returns the parent product's sales counter.
    pub fn product_sales(&self, product_id: ProductId) -> u64 {
        self.read()
            .product_sales
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the number of committed orders.
    pub fn order_count(&self) -> usize {
        self.read().orders.len()
    }

    /// Returns the number of committed order lines.
    pub fn line_count(&self) -> usize {
        self.read().lines.len()
    }

    /// Returns the number of recorded gateway trades.
    pub fn payment_count(&self) -> usize {
        self.read().payments.len()
    }

    /// Delays every in-transaction SKU read.
    pub fn set_sku_read_delay(&self, delay: Option<Duration>) {
        self.faults().sku_read_delay = delay;
    }

    /// Makes the next `misses` compare-and-set calls report a lost race.
    pub fn force_cas_misses(&self, misses: u32) {
        self.faults().forced_cas_misses = misses;
    }

    /// Configures line inserts to fail.
    pub fn set_fail_on_insert_line(&self, fail: bool) {
        self.faults().fail_on_insert_line = fail;
    }

    /// Configures product sales updates to fail.
    pub fn set_fail_on_product_sales(&self, fail: bool) {
        self.faults().fail_on_product_sales = fail;
    }

    fn undo(&self, entries: Vec<Undo>) {
        if entries.is_empty() {
            return;
        }
        let mut tables = self.write();
        for entry in entries.into_iter().rev() {
            match entry {
                Undo::Stock {
                    sku_id,
                    taken,
                    sold,
                } => {
                    if let Some(sku) = tables.skus.get_mut(&sku_id) {
                        sku.stock = sku.stock.saturating_add(taken);
                        sku.sales = sku.sales.saturating_sub(sold);
                    }
                }
                Undo::ProductSales {
                    product_id,
                    quantity,
                } => {
                    if let Some(sales) = tables.product_sales.get_mut(&product_id) {
                        *sales = sales.saturating_sub(u64::from(quantity));
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
enum Undo {
    Stock {
        sku_id: SkuId,
        taken: u32,
        sold: u32,
    },
    ProductSales {
        product_id: ProductId,
        quantity: u32,
    },
}

#[derive(Debug)]
struct Mark {
    name: String,
    undo_len: usize,
    orders_len: usize,
    lines_len: usize,
}

/// A unit of work against [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: InMemoryStore,
    undo: Vec<Undo>,
    orders: Vec<OrderHeader>,
    lines: Vec<OrderLine>,
    savepoints: Vec<Mark>,
    finished: bool,
}

impl InMemoryTransaction {
    fn mark_position(&self, name: &str) -> Result<usize> {
        self.savepoints
            .iter()
            .rposition(|mark| mark.name == name)
            .ok_or_else(|| StoreError::UnknownSavepoint(name.to_string()))
    }

    fn discard(&mut self) {
        self.finished = true;
        self.orders.clear();
        self.lines.clear();
        self.savepoints.clear();
        let undo = std::mem::take(&mut self.undo);
        self.store.undo(undo);
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn get_sku(&mut self, sku_id: SkuId) -> Result<Option<Sku>> {
        let delay = self.store.faults().sku_read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.store.sku(sku_id))
    }

    async fn compare_and_set_stock(
        &mut self,
        sku_id: SkuId,
        expected_stock: u32,
        new_stock: u32,
        new_sales: u32,
    ) -> Result<u64> {
        {
            let mut faults = self.store.faults();
            if faults.forced_cas_misses > 0 {
                faults.forced_cas_misses -= 1;
                return Ok(0);
            }
        }

        let mut tables = self.store.write();
        let sku = tables
            .skus
            .get_mut(&sku_id)
            .ok_or_else(|| StoreError::not_found("sku", sku_id))?;

        if sku.stock != expected_stock {
            return Ok(0);
        }

        let taken = expected_stock.saturating_sub(new_stock);
        let sold = new_sales.saturating_sub(sku.sales);
        sku.stock = new_stock;
        sku.sales = new_sales;
        self.undo.push(Undo::Stock {
            sku_id,
            taken,
            sold,
        });
        Ok(1)
    }

    async fn add_product_sales(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        if self.store.faults().fail_on_product_sales {
            return Err(StoreError::Unavailable(
                "product sales update failed".to_string(),
            ));
        }

        let mut tables = self.store.write();
        let sales = tables
            .product_sales
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        *sales += u64::from(quantity);
        self.undo.push(Undo::ProductSales {
            product_id,
            quantity,
        });
        Ok(())
    }

    async fn insert_order(&mut self, header: &OrderHeader) -> Result<()> {
        let exists = self.store.read().orders.contains_key(&header.order_id)
            || self.orders.iter().any(|o| o.order_id == header.order_id);
        if exists {
            return Err(StoreError::Duplicate {
                entity: "order",
                id: header.order_id.to_string(),
            });
        }
        self.orders.push(header.clone());
        Ok(())
    }

    async fn insert_line(&mut self, line: &OrderLine) -> Result<()> {
        if self.store.faults().fail_on_insert_line {
            return Err(StoreError::Unavailable("order line insert failed".to_string()));
        }
        if !self.orders.iter().any(|o| o.order_id == line.order_id) {
            return Err(StoreError::not_found("order", &line.order_id));
        }
        self.lines.push(line.clone());
        Ok(())
    }

    async fn update_order_totals(&mut self, header: &OrderHeader) -> Result<()> {
        let pending = self
            .orders
            .iter_mut()
            .find(|o| o.order_id == header.order_id)
            .ok_or_else(|| StoreError::not_found("order", &header.order_id))?;
        pending.total_count = header.total_count;
        pending.total_amount = header.total_amount;
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        self.savepoints.push(Mark {
            name: name.to_string(),
            undo_len: self.undo.len(),
            orders_len: self.orders.len(),
            lines_len: self.lines.len(),
        });
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        let position = self.mark_position(name)?;
        self.savepoints.truncate(position + 1);
        let Some(mark) = self.savepoints.last() else {
            return Err(StoreError::UnknownSavepoint(name.to_string()));
        };
        let (undo_len, orders_len, lines_len) = (mark.undo_len, mark.orders_len, mark.lines_len);

        let undo = self.undo.split_off(undo_len);
        self.store.undo(undo);
        self.orders.truncate(orders_len);
        self.lines.truncate(lines_len);
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        let position = self.mark_position(name)?;
        self.savepoints.truncate(position);
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        {
            let mut tables = self.store.write();
            let duplicate = self
                .orders
                .iter()
                .find(|o| tables.orders.contains_key(&o.order_id))
                .map(|o| o.order_id.to_string());
            if let Some(id) = duplicate {
                drop(tables);
                self.discard();
                return Err(StoreError::Duplicate { entity: "order", id });
            }

            for header in self.orders.drain(..) {
                tables.orders.insert(header.order_id.clone(), header);
            }
            tables.lines.append(&mut self.lines);
        }
        self.undo.clear();
        self.savepoints.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.discard();
        Ok(())
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            store: self.clone(),
            undo: Vec::new(),
            orders: Vec::new(),
            lines: Vec::new(),
            savepoints: Vec::new(),
            finished: false,
        })
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn get_sku(&self, sku_id: SkuId) -> Result<Option<Sku>> {
        Ok(self.sku(sku_id))
    }
}

#[async_trait]
impl AddressBook for InMemoryStore {
    async fn get_address(&self, address_id: AddressId, owner: UserId) -> Result<Option<Address>> {
        Ok(self
            .read()
            .addresses
            .get(&address_id)
            .filter(|address| address.owner == owner)
            .cloned())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn get_order(&self, order_id: &OrderId, owner: UserId) -> Result<Option<Order>> {
        let tables = self.read();
        let Some(header) = tables.orders.get(order_id).filter(|h| h.owner == owner) else {
            return Ok(None);
        };
        let lines = tables
            .lines
            .iter()
            .filter(|line| &line.order_id == order_id)
            .cloned()
            .collect();
        Ok(Some(Order::from_parts(header.clone(), lines)))
    }

    async fn order_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>> {
        Ok(self.read().orders.get(order_id).map(|h| h.status))
    }

    async fn record_payment(&self, order_id: &OrderId, trade_id: &str) -> Result<PaymentRecord> {
        let mut tables = self.write();
        if !tables.orders.contains_key(order_id) {
            return Err(StoreError::not_found("order", order_id));
        }
        if let Some(existing) = tables.payments.get(trade_id) {
            return Ok(PaymentRecord::existing(existing, order_id));
        }
        tables
            .payments
            .insert(trade_id.to_string(), order_id.clone());
        Ok(PaymentRecord::Recorded)
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<u64> {
        let mut tables = self.write();
        match tables.orders.get_mut(order_id) {
            Some(header) if header.status == from => {
                header.status = to;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
