//! Order assembly: header creation, line accumulation and freight.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, UserId};

use crate::catalog::Sku;

use super::{Money, Order, OrderError, OrderHeader, OrderLine, PayMethod};

/// Builds the order number for `owner` committing at `now`.
///
/// Second-precision UTC timestamp followed by the owner id padded to nine
/// digits, e.g. `20190627091620000000001`. Unique per user per second.
pub fn order_number(now: DateTime<Utc>, owner: UserId) -> OrderId {
    OrderId::new(format!(
        "{}{:09}",
        now.format("%Y%m%d%H%M%S"),
        owner.as_i64()
    ))
}

/// Assembles orders during a checkout attempt.
///
/// The assembler owns the freight policy. Freight is recorded on the
/// header when the order is opened and folded into the total exactly once,
/// by [`finalize`](Self::finalize), after every line has been appended.
#[derive(Debug, Clone, Copy)]
pub struct OrderAssembler {
    freight: Money,
}

impl OrderAssembler {
    /// Creates an assembler charging a fixed `freight` per order.
    pub fn new(freight: Money) -> Self {
        Self { freight }
    }

    /// Returns the freight charge.
    pub fn freight(&self) -> Money {
        self.freight
    }

    /// Opens an empty order with zero totals.
    pub fn new_order(
        &self,
        owner: UserId,
        address_id: AddressId,
        pay_method: PayMethod,
        now: DateTime<Utc>,
    ) -> Order {
        Order {
            header: OrderHeader {
                order_id: order_number(now, owner),
                owner,
                address_id,
                status: pay_method.initial_status(),
                pay_method,
                total_count: 0,
                total_amount: Money::zero(),
                freight: self.freight,
                created_at: now,
            },
            lines: Vec::new(),
            finalized: false,
        }
    }

    /// Appends a line for `quantity` units of `sku` at its current price.
    ///
    /// Must only be called once the stock for this line has actually been
    /// reserved.
    pub fn append_line<'a>(
        &self,
        order: &'a mut Order,
        sku: &Sku,
        quantity: u32,
    ) -> Result<&'a OrderLine, OrderError> {
        if order.finalized {
            return Err(OrderError::AlreadyFinalized);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        let subtotal = sku
            .price
            .checked_multiply(quantity)
            .ok_or(OrderError::Overflow)?;
        let total_amount = order
            .header
            .total_amount
            .checked_add(subtotal)
            .ok_or(OrderError::Overflow)?;
        let total_count = order
            .header
            .total_count
            .checked_add(quantity)
            .ok_or(OrderError::Overflow)?;

        order.header.total_amount = total_amount;
        order.header.total_count = total_count;
        order.lines.push(OrderLine {
            order_id: order.header.order_id.clone(),
            sku_id: sku.id,
            quantity,
            price: sku.price,
        });

        tracing::debug!(
            order_id = %order.header.order_id,
            sku_id = %sku.id,
            quantity,
            %total_amount,
            "order line appended"
        );

        order.lines.last().ok_or(OrderError::NoItems)
    }

    /// Adds freight to the total. Only valid once per order.
    pub fn finalize(&self, order: &mut Order) -> Result<(), OrderError> {
        if order.finalized {
            return Err(OrderError::AlreadyFinalized);
        }
        order.header.total_amount = order
            .header
            .total_amount
            .checked_add(order.header.freight)
            .ok_or(OrderError::Overflow)?;
        order.finalized = true;
        Ok(())
    }
}
