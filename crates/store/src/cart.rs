//! In-memory cart cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::{SkuId, UserId};

use crate::{Result, StoreError, store::CartStore};

#[derive(Debug, Default)]
struct UserCart {
    counts: HashMap<SkuId, u32>,
    selected: HashSet<SkuId>,
}

#[derive(Debug, Default)]
struct CartState {
    carts: HashMap<UserId, UserCart>,
    fail_on_remove: bool,
}

/// In-memory per-user cart store.
///
/// Mirrors the key-value layout the storefront keeps per user: a hash of
/// SKU → count and a set of selected SKUs. The write operations here are
/// the ones the cart pages perform; checkout itself only reads and then
/// purges.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<CartState>>,
}

impl InMemoryCartStore {
    /// Creates an empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `count` units, summing with any existing line.
    pub fn add(&self, user: UserId, sku_id: SkuId, count: u32, selected: bool) {
        let mut state = self.write();
        let cart = state.carts.entry(user).or_default();
        let line = cart.counts.entry(sku_id).or_insert(0);
        *line = line.saturating_add(count);
        if selected {
            cart.selected.insert(sku_id);
        }
    }

    /// Overwrites the count and selection of a line.
    pub fn set(&self, user: UserId, sku_id: SkuId, count: u32, selected: bool) {
        let mut state = self.write();
        let cart = state.carts.entry(user).or_default();
        cart.counts.insert(sku_id, count);
        if selected {
            cart.selected.insert(sku_id);
        } else {
            cart.selected.remove(&sku_id);
        }
    }

    /// Deletes a line and its selection.
    pub fn remove(&self, user: UserId, sku_id: SkuId) {
        if let Some(cart) = self.write().carts.get_mut(&user) {
            cart.counts.remove(&sku_id);
            cart.selected.remove(&sku_id);
        }
    }

    /// Selects or unselects every line in the cart.
    pub fn select_all(&self, user: UserId, selected: bool) {
        if let Some(cart) = self.write().carts.get_mut(&user) {
            if selected {
                let ids: Vec<SkuId> = cart.counts.keys().copied().collect();
                cart.selected.extend(ids);
            } else {
                cart.selected.clear();
            }
        }
    }

    /// Folds a guest cart into the user's cart after login.
    ///
    /// Guest counts overwrite the user's counts for the same SKU, and the
    /// guest's selection flag wins.
    pub fn merge_guest_cart(
        &self,
        user: UserId,
        guest: impl IntoIterator<Item = (SkuId, u32, bool)>,
    ) {
        let mut state = self.write();
        let cart = state.carts.entry(user).or_default();
        for (sku_id, count, selected) in guest {
            cart.counts.insert(sku_id, count);
            if selected {
                cart.selected.insert(sku_id);
            } else {
                cart.selected.remove(&sku_id);
            }
        }
    }

    /// Returns the count for a line, if present.
    pub fn count(&self, user: UserId, sku_id: SkuId) -> Option<u32> {
        self.read()
            .carts
            .get(&user)
            .and_then(|cart| cart.counts.get(&sku_id).copied())
    }

    /// Returns true if the line is selected.
    pub fn is_selected(&self, user: UserId, sku_id: SkuId) -> bool {
        self.read()
            .carts
            .get(&user)
            .is_some_and(|cart| cart.selected.contains(&sku_id))
    }

    /// Returns the number of distinct lines in the user's cart.
    pub fn line_count(&self, user: UserId) -> usize {
        self.read()
            .carts
            .get(&user)
            .map_or(0, |cart| cart.counts.len())
    }

    /// Configures line removal to fail.
    pub fn set_fail_on_remove(&self, fail: bool) {
        self.write().fail_on_remove = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_cart_hash(&self, user: UserId) -> Result<HashMap<SkuId, u32>> {
        Ok(self
            .read()
            .carts
            .get(&user)
            .map(|cart| cart.counts.clone())
            .unwrap_or_default())
    }

    async fn get_selected_set(&self, user: UserId) -> Result<HashSet<SkuId>> {
        Ok(self
            .read()
            .carts
            .get(&user)
            .map(|cart| cart.selected.clone())
            .unwrap_or_default())
    }

    async fn remove_lines(&self, user: UserId, sku_ids: &[SkuId]) -> Result<()> {
        let mut state = self.write();
        if state.fail_on_remove {
            return Err(StoreError::Unavailable("cart store unreachable".to_string()));
        }
        if let Some(cart) = state.carts.get_mut(&user) {
            for sku_id in sku_ids {
                cart.counts.remove(sku_id);
            }
        }
        Ok(())
    }

    async fn clear_selected(&self, user: UserId) -> Result<()> {
        if let Some(cart) = self.write().carts.get_mut(&user) {
            cart.selected.clear();
        }
        Ok(())
    }
}
