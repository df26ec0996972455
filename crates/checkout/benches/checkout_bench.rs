use checkout::{CheckoutConfig, CheckoutOrchestrator, CheckoutRequest, InventoryLedger, RetryPolicy};
use common::{AddressId, ProductId, SkuId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Address, Money, PayMethod, Sku};
use store::{CheckoutStore, InMemoryCartStore, InMemoryStore, StoreTransaction};

const HOT: SkuId = SkuId::new(1);
const PRODUCT: ProductId = ProductId::new(1);

fn orchestrator(
    stock: u32,
) -> (
    CheckoutOrchestrator<InMemoryStore, InMemoryCartStore>,
    InMemoryStore,
    InMemoryCartStore,
) {
    let store = InMemoryStore::new();
    let carts = InMemoryCartStore::new();
    store.insert_sku(Sku::new(HOT, PRODUCT, "Hot item", Money::from_cents(999), stock));
    let config = CheckoutConfig {
        retry: RetryPolicy::immediate(16),
        ..CheckoutConfig::default()
    };
    let orchestrator = CheckoutOrchestrator::new(store.clone(), carts.clone(), &config);
    (orchestrator, store, carts)
}

/// Registers a fresh buyer; order numbers are unique per user per second.
fn buyer(store: &InMemoryStore, carts: &InMemoryCartStore, id: i64) -> CheckoutRequest {
    let user = UserId::new(id);
    let address_id = AddressId::new(id);
    store.insert_address(Address::new(address_id, user, "Bench", "Somewhere", "1"));
    carts.add(user, HOT, 1, true);
    CheckoutRequest::new(user, address_id, PayMethod::Online)
}

fn bench_commit_single_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (orchestrator, store, carts) = orchestrator(u32::MAX / 2);
    let mut next_user = 0;

    c.bench_function("checkout/commit_single_line", |b| {
        b.iter(|| {
            next_user += 1;
            let request = buyer(&store, &carts, next_user);
            rt.block_on(async {
                let outcome = orchestrator.commit(request).await;
                assert!(outcome.is_committed());
            });
        });
    });
}

fn bench_insufficient_stock_rollback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (orchestrator, store, carts) = orchestrator(0);
    let request = buyer(&store, &carts, 1);

    c.bench_function("checkout/insufficient_stock_rollback", |b| {
        b.iter(|| {
            rt.block_on(async {
                let outcome = orchestrator.commit(request).await;
                assert!(!outcome.is_committed());
            });
        });
    });
}

fn bench_reserve_and_rollback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    store.insert_sku(Sku::new(HOT, PRODUCT, "Hot item", Money::from_cents(999), 1000));
    let ledger = InventoryLedger::new(RetryPolicy::immediate(16));

    c.bench_function("ledger/reserve_and_rollback", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut tx = store.begin().await.unwrap();
                ledger.reserve(&mut tx, HOT, 3).await.unwrap();
                tx.rollback().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_commit_single_line,
    bench_insufficient_stock_rollback,
    bench_reserve_and_rollback
);
criterion_main!(benches);
