//! Cart snapshot reader.

use std::collections::BTreeMap;

use common::{SkuId, UserId};
use store::{CartStore, Result};

/// Reads the lines a user selected for checkout.
///
/// Quantities come from the cart hash and membership from the selected
/// set. The map is keyed by SKU id, so callers walk it in ascending order.
#[derive(Debug, Clone)]
pub struct CartSnapshotReader<C> {
    carts: C,
}

impl<C: CartStore> CartSnapshotReader<C> {
    /// Creates a reader over `carts`.
    pub fn new(carts: C) -> Self {
        Self { carts }
    }

    /// Returns the underlying cart store.
    pub fn carts(&self) -> &C {
        &self.carts
    }

    /// Returns the selected lines as SKU id → quantity.
    ///
    /// A selected SKU with no count in the cart hash is skipped.
    pub async fn selected_lines(&self, user: UserId) -> Result<BTreeMap<SkuId, u32>> {
        let counts = self.carts.get_cart_hash(user).await?;
        let selected = self.carts.get_selected_set(user).await?;

        Ok(selected
            .into_iter()
            .filter_map(|sku_id| counts.get(&sku_id).map(|&count| (sku_id, count)))
            .collect())
    }

    /// Removes purchased lines and clears the selection.
    pub async fn purge(&self, user: UserId, sku_ids: &[SkuId]) -> Result<()> {
        self.carts.remove_lines(user, sku_ids).await?;
        self.carts.clear_selected(user).await
    }
}
