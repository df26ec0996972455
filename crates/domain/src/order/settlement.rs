//! Settlement preview shown before the buyer commits.

use common::SkuId;
use serde::{Deserialize, Serialize};

use crate::catalog::Sku;

use super::{Money, OrderError};

/// A priced cart line on the settlement page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLine {
    pub sku_id: SkuId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub amount: Money,
}

/// Totals for the selected cart lines at current catalog prices.
///
/// Nothing is reserved; the committed order may differ if prices or stock
/// change in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPreview {
    pub lines: Vec<SettlementLine>,
    pub total_count: u32,
    pub total_amount: Money,
    pub freight: Money,
    pub payment_amount: Money,
}

impl SettlementPreview {
    /// Prices `(sku, quantity)` pairs and adds `freight` once.
    pub fn price(
        selection: impl IntoIterator<Item = (Sku, u32)>,
        freight: Money,
    ) -> Result<Self, OrderError> {
        let mut lines = Vec::new();
        let mut total_count: u32 = 0;
        let mut total_amount = Money::zero();

        for (sku, quantity) in selection {
            let amount = sku
                .price
                .checked_multiply(quantity)
                .ok_or(OrderError::Overflow)?;
            total_count = total_count
                .checked_add(quantity)
                .ok_or(OrderError::Overflow)?;
            total_amount = total_amount
                .checked_add(amount)
                .ok_or(OrderError::Overflow)?;
            lines.push(SettlementLine {
                sku_id: sku.id,
                name: sku.name,
                price: sku.price,
                quantity,
                amount,
            });
        }

        let payment_amount = total_amount
            .checked_add(freight)
            .ok_or(OrderError::Overflow)?;

        Ok(Self {
            lines,
            total_count,
            total_amount,
            freight,
            payment_amount,
        })
    }

    /// Returns true if there is nothing to buy.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
