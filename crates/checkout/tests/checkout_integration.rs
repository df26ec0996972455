//! Integration tests for the checkout orchestrator.

use std::sync::Arc;
use std::time::Duration;

use checkout::{
    CheckoutConfig, CheckoutOrchestrator, CheckoutOutcome, CheckoutRequest, PaymentConfirmation,
    PaymentService, RetryPolicy,
};
use common::{AddressId, ProductId, SkuId, UserId};
use domain::{Address, Money, OrderStatus, PayMethod, Sku};
use futures_util::future::join_all;
use store::{InMemoryCartStore, InMemoryStore};

type TestOrchestrator = CheckoutOrchestrator<InMemoryStore, InMemoryCartStore>;

const APPLE: SkuId = SkuId::new(1);
const PEAR: SkuId = SkuId::new(2);
const FRUIT: ProductId = ProductId::new(100);

struct TestHarness {
    orchestrator: Arc<TestOrchestrator>,
    store: InMemoryStore,
    carts: InMemoryCartStore,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(CheckoutConfig {
            retry: RetryPolicy::immediate(32),
            ..CheckoutConfig::default()
        })
    }

    fn with_config(config: CheckoutConfig) -> Self {
        let store = InMemoryStore::new();
        let carts = InMemoryCartStore::new();
        let orchestrator = CheckoutOrchestrator::new(store.clone(), carts.clone(), &config);

        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            carts,
        }
    }

    fn stock(&self, sku_id: SkuId, stock: u32, cents: i64) {
        self.store.insert_sku(Sku::new(
            sku_id,
            FRUIT,
            format!("Fruit #{sku_id}"),
            Money::from_cents(cents),
            stock,
        ));
    }

    /// Registers a buyer with one live address and returns their request.
    fn buyer(&self, id: i64) -> CheckoutRequest {
        let user = UserId::new(id);
        let address_id = AddressId::new(id * 10);
        self.store
            .insert_address(Address::new(address_id, user, "Li", "Beijing", "13800000000"));
        CheckoutRequest::new(user, address_id, PayMethod::Online)
    }

    fn select(&self, request: &CheckoutRequest, sku_id: SkuId, quantity: u32) {
        self.carts.add(request.user_id, sku_id, quantity, true);
    }

    fn stock_of(&self, sku_id: SkuId) -> u32 {
        self.store.sku(sku_id).unwrap().stock
    }

    fn sales_of(&self, sku_id: SkuId) -> u32 {
        self.store.sku(sku_id).unwrap().sales
    }

    fn assert_untouched(&self, sku_id: SkuId, stock: u32) {
        assert_eq!(self.stock_of(sku_id), stock);
        assert_eq!(self.sales_of(sku_id), 0);
        assert_eq!(self.store.product_sales(FRUIT), 0);
        assert_eq!(self.store.order_count(), 0);
        assert_eq!(self.store.line_count(), 0);
    }
}

#[tokio::test]
async fn test_single_line_checkout_commits_order() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 3);

    let outcome = h.orchestrator.commit(request).await;

    let summary = outcome.order().cloned().expect("order committed");
    assert_eq!(outcome.code(), "0");
    assert_eq!(summary.status, OrderStatus::Unpaid);
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.freight, Money::from_cents(1000));
    assert_eq!(summary.total_amount, Money::from_cents(4000));
    assert_eq!(summary.total_amount.to_string(), "40.00");

    assert_eq!(h.stock_of(APPLE), 2);
    assert_eq!(h.sales_of(APPLE), 3);
    assert_eq!(h.store.product_sales(FRUIT), 3);

    let order = h
        .orchestrator
        .find_order(&summary.order_id, request.user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(order.is_balanced());
    assert_eq!(order.lines().len(), 1);
    assert_eq!(order.lines()[0].price, Money::from_cents(1000));
    assert!(summary.order_id.as_str().ends_with("000000001"));
}

#[tokio::test]
async fn test_multi_line_total_matches_lines_plus_freight() {
    let h = TestHarness::new();
    h.stock(APPLE, 10, 1250);
    h.stock(PEAR, 10, 399);
    let request = h.buyer(1);
    h.select(&request, PEAR, 4);
    h.select(&request, APPLE, 2);

    let outcome = h.orchestrator.commit(request).await;

    let summary = outcome.order().cloned().unwrap();
    assert_eq!(summary.line_count, 2);
    assert_eq!(summary.total_count, 6);
    // 2 x 12.50 + 4 x 3.99 + 10.00
    assert_eq!(summary.total_amount, Money::from_cents(2500 + 1596 + 1000));

    let order = h
        .orchestrator
        .find_order(&summary.order_id, request.user_id)
        .await
        .unwrap()
        .unwrap();
    let skus: Vec<SkuId> = order.lines().iter().map(|line| line.sku_id).collect();
    assert_eq!(skus, vec![APPLE, PEAR]);
    assert!(order.is_balanced());
}

#[tokio::test]
async fn test_cash_order_starts_unsent() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let mut request = h.buyer(1);
    request.pay_method = PayMethod::Cash.code();
    h.select(&request, APPLE, 1);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome.order().unwrap().status, OrderStatus::Unsent);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_nothing_behind() {
    let h = TestHarness::new();
    h.stock(APPLE, 2, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 5);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::InsufficientStock);
    assert_eq!(outcome.code(), "5001");
    h.assert_untouched(APPLE, 2);
    // Cart is kept so the buyer can adjust it
    assert_eq!(h.carts.count(request.user_id, APPLE), Some(5));
}

#[tokio::test]
async fn test_later_shortfall_undoes_earlier_lines() {
    let h = TestHarness::new();
    h.stock(APPLE, 10, 1000);
    h.stock(PEAR, 1, 500);
    let request = h.buyer(1);
    h.select(&request, APPLE, 3);
    h.select(&request, PEAR, 2);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::InsufficientStock);
    h.assert_untouched(APPLE, 10);
    assert_eq!(h.stock_of(PEAR), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_buyers_race_for_the_last_units() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    // Both attempts read stock 5 before either writes
    h.store.set_sku_read_delay(Some(Duration::from_millis(20)));

    let requests: Vec<CheckoutRequest> = (1..=2).map(|id| h.buyer(id)).collect();
    for request in &requests {
        h.select(request, APPLE, 3);
    }

    let handles = requests.into_iter().map(|request| {
        let orchestrator = Arc::clone(&h.orchestrator);
        tokio::spawn(async move { orchestrator.commit(request).await })
    });
    let outcomes: Vec<CheckoutOutcome> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let committed = outcomes.iter().filter(|o| o.is_committed()).count();
    let short = outcomes
        .iter()
        .filter(|o| **o == CheckoutOutcome::InsufficientStock)
        .count();
    assert_eq!((committed, short), (1, 1), "outcomes: {outcomes:?}");
    assert_eq!(h.stock_of(APPLE), 2);
    assert_eq!(h.sales_of(APPLE), 3);
    assert_eq!(h.store.order_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_buyers_never_oversell() {
    let h = TestHarness::new();
    h.stock(APPLE, 20, 1000);

    let requests: Vec<CheckoutRequest> = (1..=10).map(|id| h.buyer(id)).collect();
    for request in &requests {
        h.select(request, APPLE, 3);
    }

    let handles = requests.into_iter().map(|request| {
        let orchestrator = Arc::clone(&h.orchestrator);
        tokio::spawn(async move { orchestrator.commit(request).await })
    });
    let outcomes: Vec<CheckoutOutcome> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let committed = outcomes.iter().filter(|o| o.is_committed()).count();
    assert_eq!(committed, 6, "outcomes: {outcomes:?}");
    assert!(
        outcomes
            .iter()
            .all(|o| o.is_committed() || *o == CheckoutOutcome::InsufficientStock)
    );
    assert_eq!(h.stock_of(APPLE), 2);
    assert_eq!(h.sales_of(APPLE), 18);
    assert_eq!(h.store.product_sales(FRUIT), 18);
    assert_eq!(h.store.order_count(), 6);
}

#[tokio::test]
async fn test_exhausted_retries_report_contention() {
    let h = TestHarness::with_config(CheckoutConfig {
        retry: RetryPolicy::immediate(3),
        ..CheckoutConfig::default()
    });
    h.stock(APPLE, 5, 1000);
    h.store.force_cas_misses(100);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::Contention);
    assert_eq!(outcome.code(), "5002");
    h.assert_untouched(APPLE, 5);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_rolls_back_reserved_lines() {
    let h = TestHarness::with_config(CheckoutConfig {
        retry: RetryPolicy::immediate(4),
        deadline: Duration::from_millis(300),
        ..CheckoutConfig::default()
    });
    h.stock(APPLE, 5, 1000);
    h.stock(PEAR, 5, 1000);
    // APPLE is reserved at 200ms; reading PEAR would finish at 400ms
    h.store.set_sku_read_delay(Some(Duration::from_millis(200)));
    let request = h.buyer(1);
    h.select(&request, APPLE, 2);
    h.select(&request, PEAR, 2);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::TimedOut);
    assert_eq!(outcome.code(), "5003");
    h.assert_untouched(APPLE, 5);
    assert_eq!(h.stock_of(PEAR), 5);
}

#[tokio::test]
async fn test_line_insert_fault_is_commit_failed() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    h.store.set_fail_on_insert_line(true);
    let request = h.buyer(1);
    h.select(&request, APPLE, 2);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::CommitFailed);
    assert_eq!(outcome.code(), "5000");
    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_product_sales_fault_rolls_back_sku_write() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    h.store.set_fail_on_product_sales(true);
    let request = h.buyer(1);
    h.select(&request, APPLE, 2);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::CommitFailed);
    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_vanished_sku_is_commit_failed() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);
    h.select(&request, SkuId::new(404), 1);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::CommitFailed);
    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_zero_quantity_line_is_commit_failed() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.carts.set(request.user_id, APPLE, 0, true);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::CommitFailed);
    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_empty_selection_creates_no_order() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.carts.add(request.user_id, APPLE, 2, false);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::EmptyCart);
    assert_eq!(outcome.code(), "4001");
    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_foreign_or_deleted_address_is_rejected() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let owner = h.buyer(1);
    let intruder = h.buyer(2);
    h.select(&intruder, APPLE, 1);

    let foreign = CheckoutRequest {
        address_id: owner.address_id,
        ..intruder
    };
    assert_eq!(
        h.orchestrator.commit(foreign).await,
        CheckoutOutcome::AddressInvalid
    );

    let mut deleted = Address::new(intruder.address_id, intruder.user_id, "Li", "Gone", "1");
    deleted.is_deleted = true;
    h.store.insert_address(deleted);
    assert_eq!(
        h.orchestrator.commit(intruder).await,
        CheckoutOutcome::AddressInvalid
    );

    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_unknown_pay_method_is_rejected() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let mut request = h.buyer(1);
    request.pay_method = 9;
    h.select(&request, APPLE, 1);

    let outcome = h.orchestrator.commit(request).await;

    assert_eq!(outcome, CheckoutOutcome::InvalidPayMethod);
    h.assert_untouched(APPLE, 5);
}

#[tokio::test]
async fn test_purchased_lines_leave_the_cart() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    h.stock(PEAR, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);
    h.carts.add(request.user_id, PEAR, 2, false);

    let outcome = h.orchestrator.commit(request).await;

    assert!(outcome.is_committed());
    assert_eq!(h.carts.count(request.user_id, APPLE), None);
    assert_eq!(h.carts.count(request.user_id, PEAR), Some(2));
    assert!(!h.carts.is_selected(request.user_id, APPLE));
}

#[tokio::test]
async fn test_repeated_cart_cleanup_leaves_orders_and_stock_alone() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 2);
    assert!(h.orchestrator.commit(request).await.is_committed());

    for _ in 0..2 {
        h.orchestrator
            .carts()
            .purge(request.user_id, &[APPLE])
            .await
            .unwrap();
    }

    assert_eq!(h.store.order_count(), 1);
    assert_eq!(h.store.line_count(), 1);
    assert_eq!(h.stock_of(APPLE), 3);
    assert_eq!(h.sales_of(APPLE), 2);
    assert_eq!(h.store.product_sales(FRUIT), 2);

    // Nothing left selected, so a second checkout buys nothing
    let again = h.orchestrator.commit(request).await;
    assert!(!again.is_committed());
    assert_eq!(h.store.order_count(), 1);
    assert_eq!(h.stock_of(APPLE), 3);
}

#[tokio::test]
async fn test_cart_cleanup_failure_keeps_the_order() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    h.carts.set_fail_on_remove(true);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);

    let outcome = h.orchestrator.commit(request).await;

    assert!(outcome.is_committed());
    assert_eq!(h.store.order_count(), 1);
    assert_eq!(h.carts.count(request.user_id, APPLE), Some(1));
}

#[tokio::test]
async fn test_preview_matches_committed_totals() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1250);
    h.stock(PEAR, 5, 399);
    let request = h.buyer(1);
    h.select(&request, APPLE, 2);
    h.select(&request, PEAR, 3);

    let preview = h.orchestrator.preview(request.user_id).await.unwrap();
    assert_eq!(preview.lines.len(), 2);
    assert_eq!(preview.total_count, 5);
    assert_eq!(preview.total_amount, Money::from_cents(2500 + 1197));
    assert_eq!(preview.freight, Money::from_cents(1000));
    // Nothing reserved
    assert_eq!(h.stock_of(APPLE), 5);

    let summary = h.orchestrator.commit(request).await.order().cloned().unwrap();
    assert_eq!(summary.total_amount, preview.payment_amount);
    assert_eq!(summary.total_count, preview.total_count);
}

#[tokio::test]
async fn test_preview_skips_missing_skus() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);
    h.select(&request, SkuId::new(404), 1);

    let preview = h.orchestrator.preview(request.user_id).await.unwrap();

    assert_eq!(preview.lines.len(), 1);
    assert_eq!(preview.payment_amount, Money::from_cents(2000));
}

#[tokio::test]
async fn test_payment_after_checkout() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);
    let order_id = h
        .orchestrator
        .commit(request)
        .await
        .order()
        .unwrap()
        .order_id
        .clone();

    let payments = PaymentService::new(h.store.clone());
    assert_eq!(
        payments.confirm(&order_id, "2019062722001").await.unwrap(),
        PaymentConfirmation::Confirmed
    );
    assert_eq!(
        payments.confirm(&order_id, "2019062722001").await.unwrap(),
        PaymentConfirmation::AlreadyRecorded
    );

    let order = h
        .orchestrator
        .find_order(&order_id, request.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Uncomment);
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let h = TestHarness::new();
    h.stock(APPLE, 5, 1000);
    let request = h.buyer(1);
    h.select(&request, APPLE, 1);
    let summary = h.orchestrator.commit(request).await.order().cloned().unwrap();

    let other = h
        .orchestrator
        .find_order(&summary.order_id, UserId::new(2))
        .await
        .unwrap();
    assert!(other.is_none());
}
