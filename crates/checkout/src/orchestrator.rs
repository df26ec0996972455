//! Checkout orchestrator: turns a cart selection into a committed order.

use std::time::{Duration, Instant};

use chrono::Utc;
use common::{AttemptId, OrderId, SkuId, UserId};
use domain::{Order, OrderAssembler, PayMethod, SettlementPreview};
use store::{AddressBook, CartStore, Catalog, CheckoutStore, OrderRepository, StoreTransaction};

use crate::cart::CartSnapshotReader;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::ledger::{InventoryLedger, Reservation};
use crate::outcome::{CheckoutOutcome, CheckoutRequest, OrderSummary};
use crate::state::CheckoutState;

const SAVEPOINT: &str = "checkout";

/// Result of the transactional part of an attempt.
enum Staged {
    /// Ready to commit.
    Ready { order: Order, purchased: Vec<SkuId> },
    /// A business rejection; the attempt must be rolled back.
    Rejected(CheckoutOutcome),
}

/// Orchestrates checkout attempts.
///
/// Every attempt runs in one store transaction with a savepoint taken
/// before the first write. Stock is reserved line by line in ascending SKU
/// order; any rejection, fault or deadline expiry discards the whole
/// attempt at a single rollback site, so callers always get a
/// [`CheckoutOutcome`] and never a partial order.
pub struct CheckoutOrchestrator<S, C>
where
    S: CheckoutStore + Catalog + AddressBook + OrderRepository,
    C: CartStore,
{
    store: S,
    carts: CartSnapshotReader<C>,
    ledger: InventoryLedger,
    assembler: OrderAssembler,
    deadline: Duration,
}

impl<S, C> CheckoutOrchestrator<S, C>
where
    S: CheckoutStore + Catalog + AddressBook + OrderRepository,
    C: CartStore,
{
    /// Creates a new orchestrator.
    pub fn new(store: S, carts: C, config: &CheckoutConfig) -> Self {
        Self {
            store,
            carts: CartSnapshotReader::new(carts),
            ledger: InventoryLedger::new(config.retry),
            assembler: OrderAssembler::new(config.freight),
            deadline: config.deadline,
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cart snapshot reader.
    pub fn carts(&self) -> &CartSnapshotReader<C> {
        &self.carts
    }

    /// Commits the user's selected cart lines as one order.
    #[tracing::instrument(skip(self), fields(attempt_id = %AttemptId::new()))]
    pub async fn commit(&self, request: CheckoutRequest) -> CheckoutOutcome {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let outcome = self.run(request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if outcome.is_committed() {
            metrics::counter!("checkout_committed_total").increment(1);
        } else {
            metrics::counter!("checkout_rejected_total", "reason" => outcome.reason())
                .increment(1);
        }
        outcome
    }

    async fn run(&self, request: CheckoutRequest) -> CheckoutOutcome {
        let Some(pay_method) = PayMethod::from_code(request.pay_method) else {
            tracing::warn!(code = request.pay_method, "unknown pay method");
            return CheckoutOutcome::InvalidPayMethod;
        };

        match self
            .store
            .get_address(request.address_id, request.user_id)
            .await
        {
            Ok(Some(address)) if address.is_usable_by(request.user_id) => {}
            Ok(_) => {
                tracing::warn!(address_id = %request.address_id, "address not usable");
                return CheckoutOutcome::AddressInvalid;
            }
            Err(e) => {
                tracing::error!(error = %e, "address lookup failed");
                return CheckoutOutcome::CommitFailed;
            }
        }

        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!(error = %e, "could not open transaction");
                return CheckoutOutcome::CommitFailed;
            }
        };

        let mut state = CheckoutState::Started;
        let staged = tokio::time::timeout(
            self.deadline,
            self.stage(&mut tx, &request, pay_method, &mut state),
        )
        .await;

        let rejection = match staged {
            Ok(Ok(Staged::Ready { order, purchased })) => {
                return self
                    .finish(tx, &mut state, request.user_id, order, purchased)
                    .await;
            }
            Ok(Ok(Staged::Rejected(outcome))) => outcome,
            Ok(Err(CheckoutError::Contention { sku_id, attempts })) => {
                tracing::warn!(%sku_id, attempts, "stock contention, giving up");
                CheckoutOutcome::Contention
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, %state, "checkout faulted");
                CheckoutOutcome::CommitFailed
            }
            Err(_) => {
                tracing::warn!(deadline = ?self.deadline, %state, "checkout timed out");
                CheckoutOutcome::TimedOut
            }
        };

        Self::roll_back(tx, &mut state).await;
        rejection
    }

    /// Steps that run under the deadline: everything up to the commit.
    async fn stage(
        &self,
        tx: &mut S::Tx,
        request: &CheckoutRequest,
        pay_method: PayMethod,
        state: &mut CheckoutState,
    ) -> Result<Staged> {
        tx.savepoint(SAVEPOINT).await?;

        let mut order = self.assembler.new_order(
            request.user_id,
            request.address_id,
            pay_method,
            Utc::now(),
        );
        tx.insert_order(order.header()).await?;

        let lines = self.carts.selected_lines(request.user_id).await?;
        if lines.is_empty() {
            tracing::warn!("no cart lines selected");
            return Ok(Staged::Rejected(CheckoutOutcome::EmptyCart));
        }

        for (index, (&sku_id, &quantity)) in lines.iter().enumerate() {
            advance(state, CheckoutState::Reserving { line: index });

            match self.ledger.reserve(tx, sku_id, quantity).await? {
                Reservation::Reserved(sku) => {
                    let line = self.assembler.append_line(&mut order, &sku, quantity)?;
                    tx.insert_line(line).await?;
                }
                Reservation::Insufficient { available } => {
                    tracing::warn!(%sku_id, quantity, available, "insufficient stock");
                    return Ok(Staged::Rejected(CheckoutOutcome::InsufficientStock));
                }
            }
        }
        advance(state, CheckoutState::AllReserved);

        self.assembler.finalize(&mut order)?;
        tx.update_order_totals(order.header()).await?;
        tx.release_savepoint(SAVEPOINT).await?;
        advance(state, CheckoutState::Persisted);

        Ok(Staged::Ready {
            order,
            purchased: lines.into_keys().collect(),
        })
    }

    async fn finish(
        &self,
        tx: S::Tx,
        state: &mut CheckoutState,
        user: UserId,
        order: Order,
        purchased: Vec<SkuId>,
    ) -> CheckoutOutcome {
        if let Err(e) = tx.commit().await {
            tracing::error!(error = %e, order_id = %order.id(), "commit failed");
            advance(state, CheckoutState::RolledBack);
            return CheckoutOutcome::CommitFailed;
        }
        advance(state, CheckoutState::Succeeded);

        tracing::info!(
            order_id = %order.id(),
            total_count = order.total_count(),
            total_amount = %order.total_amount(),
            "order committed"
        );

        if let Err(e) = self.carts.purge(user, &purchased).await {
            tracing::warn!(error = %e, order_id = %order.id(), "cart cleanup failed");
        }

        CheckoutOutcome::Committed(OrderSummary::from(&order))
    }

    async fn roll_back(mut tx: S::Tx, state: &mut CheckoutState) {
        if state.holds_reservations() {
            tracing::debug!(%state, "undoing stock reservations");
            metrics::counter!("stock_reservations_undone_total").increment(1);
        }
        if let Err(e) = tx.rollback_to_savepoint(SAVEPOINT).await {
            tracing::debug!(error = %e, "rollback to savepoint failed");
        }
        if let Err(e) = tx.rollback().await {
            tracing::error!(error = %e, "rollback failed");
        }
        advance(state, CheckoutState::RolledBack);
    }

    /// Prices the user's selected lines without reserving anything.
    ///
    /// SKUs no longer in the catalog are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn preview(&self, user: UserId) -> Result<SettlementPreview> {
        let lines = self.carts.selected_lines(user).await?;

        let mut priced = Vec::with_capacity(lines.len());
        for (sku_id, quantity) in lines {
            match self.store.get_sku(sku_id).await? {
                Some(sku) => priced.push((sku, quantity)),
                None => tracing::debug!(%sku_id, "selected sku missing from catalog"),
            }
        }

        Ok(SettlementPreview::price(priced, self.assembler.freight())?)
    }

    /// Loads a committed order owned by `owner`.
    pub async fn find_order(&self, order_id: &OrderId, owner: UserId) -> Result<Option<Order>> {
        Ok(self.store.get_order(order_id, owner).await?)
    }
}

fn advance(state: &mut CheckoutState, next: CheckoutState) {
    debug_assert!(
        state.can_advance_to(next),
        "illegal checkout transition {state} -> {next}"
    );
    tracing::trace!(from = %state, to = %next, "checkout state");
    *state = next;
}
