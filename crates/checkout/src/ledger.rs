//! Inventory ledger: optimistic stock reservation.

use common::SkuId;
use domain::{OrderError, Sku};
use store::StoreTransaction;

use crate::error::{CheckoutError, Result};
use crate::retry::RetryPolicy;

/// Result of a single compare-and-set attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveAttempt {
    /// Stock was decremented. Carries the SKU as written.
    Reserved(Sku),
    /// Stock cannot cover the request. Nothing was written.
    Insufficient { available: u32 },
    /// Another writer changed the stock since it was read.
    Conflict,
}

/// Result of a reservation once retries have settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// Stock and sales were updated. Carries the SKU as written.
    Reserved(Sku),
    /// Stock cannot cover the request.
    Insufficient { available: u32 },
}

/// Decrements SKU stock without holding row locks across reads.
///
/// Each attempt reads the row, computes the new stock and writes it back
/// only if the stored stock is unchanged. Lost races are retried under a
/// [`RetryPolicy`]; running out of attempts is reported as
/// [`CheckoutError::Contention`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger {
    policy: RetryPolicy,
}

impl InventoryLedger {
    /// Creates a ledger retrying under `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Makes one compare-and-set attempt for `quantity` units.
    pub async fn try_reserve<T>(
        &self,
        tx: &mut T,
        sku_id: SkuId,
        quantity: u32,
    ) -> Result<ReserveAttempt>
    where
        T: StoreTransaction,
    {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity }.into());
        }

        let sku = tx
            .get_sku(sku_id)
            .await?
            .ok_or(CheckoutError::SkuNotFound(sku_id))?;

        let Some(new_stock) = sku.stock.checked_sub(quantity) else {
            return Ok(ReserveAttempt::Insufficient {
                available: sku.stock,
            });
        };
        let new_sales = sku
            .sales
            .checked_add(quantity)
            .ok_or(OrderError::Overflow)?;

        let rows = tx
            .compare_and_set_stock(sku_id, sku.stock, new_stock, new_sales)
            .await?;
        if rows == 0 {
            return Ok(ReserveAttempt::Conflict);
        }

        Ok(ReserveAttempt::Reserved(Sku {
            stock: new_stock,
            sales: new_sales,
            ..sku
        }))
    }

    /// Reserves `quantity` units, retrying lost races.
    ///
    /// On success the parent product's sales counter is incremented in the
    /// same transaction.
    #[tracing::instrument(skip(self, tx))]
    pub async fn reserve<T>(&self, tx: &mut T, sku_id: SkuId, quantity: u32) -> Result<Reservation>
    where
        T: StoreTransaction,
    {
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            match self.try_reserve(tx, sku_id, quantity).await? {
                ReserveAttempt::Reserved(sku) => {
                    tx.add_product_sales(sku.product_id, quantity).await?;
                    tracing::debug!(
                        attempt,
                        stock = sku.stock,
                        sales = sku.sales,
                        "stock reserved"
                    );
                    return Ok(Reservation::Reserved(sku));
                }
                ReserveAttempt::Insufficient { available } => {
                    return Ok(Reservation::Insufficient { available });
                }
                ReserveAttempt::Conflict => {
                    metrics::counter!("stock_cas_conflicts_total").increment(1);
                    tracing::debug!(attempt, "stock changed underneath, retrying");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(CheckoutError::Contention { sku_id, attempts })
    }
}
