//! Payment confirmation for online orders.

use common::OrderId;
use domain::OrderStatus;
use store::{OrderRepository, PaymentRecord};

use crate::error::PaymentError;

/// What a confirmation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentConfirmation {
    /// The order moved to awaiting review.
    Confirmed,
    /// The trade had already been recorded and the order had already moved.
    AlreadyRecorded,
}

/// Applies gateway payment confirmations to committed orders.
#[derive(Debug, Clone)]
pub struct PaymentService<R> {
    orders: R,
}

impl<R: OrderRepository> PaymentService<R> {
    /// Creates a new payment service.
    pub fn new(orders: R) -> Self {
        Self { orders }
    }

    /// Records `trade_id` against the order and marks it paid.
    ///
    /// Confirming the same trade for the same order again retries the
    /// `Unpaid` to `Uncomment` transition, which is a no-op once the order
    /// has moved. A trade id already used for another order is refused.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        order_id: &OrderId,
        trade_id: &str,
    ) -> Result<PaymentConfirmation, PaymentError> {
        let Some(status) = self.orders.order_status(order_id).await? else {
            return Err(PaymentError::OrderNotFound(order_id.clone()));
        };

        let newly_recorded = match self.orders.record_payment(order_id, trade_id).await? {
            PaymentRecord::Recorded => true,
            PaymentRecord::AlreadyRecorded => false,
            PaymentRecord::OtherOrder(paid_order) => {
                tracing::warn!(%paid_order, "trade already used for another order");
                return Err(PaymentError::TradeBelongsToOtherOrder {
                    trade_id: trade_id.to_string(),
                    paid_order,
                });
            }
        };

        let moved = self
            .orders
            .transition_status(order_id, OrderStatus::Unpaid, OrderStatus::Uncomment)
            .await?;
        if moved == 0 {
            if !newly_recorded {
                tracing::debug!("trade already recorded");
                return Ok(PaymentConfirmation::AlreadyRecorded);
            }
            let status = self.orders.order_status(order_id).await?.unwrap_or(status);
            tracing::warn!(%status, "payment for an order that is not awaiting payment");
            return Err(PaymentError::NotAwaitingPayment {
                order_id: order_id.clone(),
                status,
            });
        }

        metrics::counter!("payments_confirmed_total").increment(1);
        tracing::info!(newly_recorded, "payment confirmed");
        Ok(PaymentConfirmation::Confirmed)
    }
}
