//! Concurrent checkout simulation against a single hot SKU.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use checkout::{CheckoutOrchestrator, CheckoutOutcome, CheckoutRequest, PaymentService};
use common::{AddressId, ProductId, SkuId, UserId};
use domain::{Address, Money, PayMethod, Sku};
use futures_util::future::join_all;
use serde::Serialize;
use store::{
    AddressBook, Catalog, CheckoutStore, InMemoryCartStore, InMemoryStore, OrderRepository,
    PostgresStore,
};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

pub const HOT_SKU: SkuId = SkuId::new(1);
pub const HOT_PRODUCT: ProductId = ProductId::new(1);

/// Store backends the simulator can seed.
#[async_trait]
pub trait SeedStore: Send + Sync {
    async fn seed_sku(&self, sku: Sku) -> store::Result<()>;
    async fn seed_address(&self, address: Address) -> store::Result<()>;
}

#[async_trait]
impl SeedStore for InMemoryStore {
    async fn seed_sku(&self, sku: Sku) -> store::Result<()> {
        self.insert_sku(sku);
        Ok(())
    }

    async fn seed_address(&self, address: Address) -> store::Result<()> {
        self.insert_address(address);
        Ok(())
    }
}

#[async_trait]
impl SeedStore for PostgresStore {
    async fn seed_sku(&self, sku: Sku) -> store::Result<()> {
        self.upsert_sku(&sku).await
    }

    async fn seed_address(&self, address: Address) -> store::Result<()> {
        self.upsert_address(&address).await
    }
}

/// Summary of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimReport {
    pub customers: usize,
    pub committed: usize,
    /// Rejections keyed by outcome reason.
    pub rejected: BTreeMap<String, usize>,
    pub paid: usize,
    pub initial_stock: u32,
    pub final_stock: u32,
    pub final_sales: u32,
    pub revenue: Money,
}

impl SimReport {
    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns true if no unit was sold twice or lost.
    pub fn is_consistent(&self, quantity: u32) -> bool {
        let sold = u64::try_from(self.committed).unwrap_or(u64::MAX) * u64::from(quantity);
        u64::from(self.final_sales) == sold
            && u64::from(self.final_stock) + sold == u64::from(self.initial_stock)
    }
}

/// Seeds `store`, lets every buyer check out at once, then pays every
/// committed order.
pub async fn run<S>(store: S, config: &AppConfig) -> Result<SimReport>
where
    S: CheckoutStore + Catalog + AddressBook + OrderRepository + SeedStore + Clone + 'static,
{
    let carts = InMemoryCartStore::new();
    store
        .seed_sku(Sku::new(
            HOT_SKU,
            HOT_PRODUCT,
            "Limited edition",
            Money::from_cents(1999),
            config.stock,
        ))
        .await?;

    let mut requests = Vec::with_capacity(config.customers);
    for customer in 1..=config.customers {
        let user = UserId::new(i64::try_from(customer).unwrap_or(i64::MAX));
        let address_id = AddressId::new(user.as_i64());
        store
            .seed_address(Address::new(
                address_id,
                user,
                format!("Buyer {customer}"),
                "Simulated street",
                "13800000000",
            ))
            .await?;
        carts.add(user, HOT_SKU, config.quantity, true);
        requests.push(CheckoutRequest::new(user, address_id, PayMethod::Online));
    }

    tracing::info!(
        customers = config.customers,
        stock = config.stock,
        quantity = config.quantity,
        "starting checkout run"
    );

    let orchestrator = Arc::new(CheckoutOrchestrator::new(
        store.clone(),
        carts,
        &config.checkout,
    ));
    let handles = requests.into_iter().map(|request| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.commit(request).await })
    });

    let mut outcomes = Vec::with_capacity(config.customers);
    for joined in join_all(handles).await {
        outcomes.push(joined?);
    }

    let payments = PaymentService::new(store.clone());
    let mut committed = 0;
    let mut paid = 0;
    let mut revenue = Money::zero();
    let mut rejected: BTreeMap<String, usize> = BTreeMap::new();
    for outcome in &outcomes {
        match outcome {
            CheckoutOutcome::Committed(summary) => {
                committed += 1;
                revenue = revenue
                    .checked_add(summary.total_amount)
                    .ok_or(AppError::RevenueOverflow)?;
                let trade_id = format!("SIM-{}", summary.order_id);
                match payments.confirm(&summary.order_id, &trade_id).await {
                    Ok(_) => paid += 1,
                    Err(e) => tracing::warn!(error = %e, order_id = %summary.order_id, "payment failed"),
                }
            }
            other => *rejected.entry(other.reason().to_string()).or_default() += 1,
        }
    }

    let sku = store.get_sku(HOT_SKU).await?.ok_or(AppError::MissingSku)?;
    metrics::gauge!("sim_final_stock").set(f64::from(sku.stock));

    Ok(SimReport {
        customers: config.customers,
        committed,
        rejected,
        paid,
        initial_stock: config.stock,
        final_stock: sku.stock,
        final_sales: sku.sales,
        revenue,
    })
}
