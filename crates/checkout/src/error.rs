//! Checkout error types.

use common::{OrderId, SkuId};
use domain::{OrderError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Faults raised inside a checkout attempt.
///
/// These never reach callers of
/// [`CheckoutOrchestrator::commit`](crate::CheckoutOrchestrator::commit);
/// the orchestrator rolls back and maps each one to a
/// [`CheckoutOutcome`](crate::CheckoutOutcome).
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Order assembly error.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A SKU in the cart no longer exists in the catalog.
    #[error("SKU not found: {0}")]
    SkuNotFound(SkuId),

    /// The stock row kept changing under every compare-and-set attempt.
    #[error("Stock contention on SKU {sku_id} after {attempts} attempts")]
    Contention { sku_id: SkuId, attempts: u32 },
}

/// Errors returned by payment confirmation.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not waiting for a payment.
    #[error("Order {order_id} is not awaiting payment (status: {status})")]
    NotAwaitingPayment { order_id: OrderId, status: OrderStatus },

    /// The trade id was already used to pay a different order.
    #[error("Trade {trade_id} already paid order {paid_order}")]
    TradeBelongsToOtherOrder { trade_id: String, paid_order: OrderId },

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
