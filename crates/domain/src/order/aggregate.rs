//! Order aggregate: header plus line items.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderStatus, PayMethod};

/// The persisted order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub order_id: OrderId,
    pub owner: UserId,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub pay_method: PayMethod,
    pub total_count: u32,
    /// Sum of line subtotals, plus freight once the order is finalized.
    pub total_amount: Money,
    pub freight: Money,
    pub created_at: DateTime<Utc>,
}

/// One purchased SKU within an order.
///
/// `price` is the unit price captured when the line was created, so later
/// catalog price changes never alter a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub sku_id: SkuId,
    pub quantity: u32,
    pub price: Money,
}

impl OrderLine {
    /// Returns price × quantity, or None on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.price.checked_multiply(self.quantity)
    }
}

/// Order aggregate root.
///
/// Built up by [`OrderAssembler`](super::OrderAssembler) during a checkout
/// attempt and owned exclusively by that attempt until commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub(crate) header: OrderHeader,
    pub(crate) lines: Vec<OrderLine>,
    pub(crate) finalized: bool,
}

impl Order {
    /// Rebuilds a finalized order from persisted rows.
    pub fn from_parts(header: OrderHeader, lines: Vec<OrderLine>) -> Self {
        Self {
            header,
            lines,
            finalized: true,
        }
    }

    /// Returns the header.
    pub fn header(&self) -> &OrderHeader {
        &self.header
    }

    /// Returns the order number.
    pub fn id(&self) -> &OrderId {
        &self.header.order_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.header.status
    }

    /// Returns all line items in insertion order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the line for a SKU, if purchased.
    pub fn line(&self, sku_id: SkuId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.sku_id == sku_id)
    }

    /// Returns the total item count.
    pub fn total_count(&self) -> u32 {
        self.header.total_count
    }

    /// Returns the total amount (including freight once finalized).
    pub fn total_amount(&self) -> Money {
        self.header.total_amount
    }

    /// Returns the freight charge.
    pub fn freight(&self) -> Money {
        self.header.freight
    }

    /// Returns true once freight has been added.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sum of line subtotals, without freight.
    pub fn lines_total(&self) -> Option<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.subtotal()?))
    }

    /// Returns true if the stored total equals the line subtotals plus freight.
    pub fn is_balanced(&self) -> bool {
        let expected = self
            .lines_total()
            .and_then(|lines| lines.checked_add(self.header.freight));
        self.finalized && expected == Some(self.header.total_amount)
    }
}
