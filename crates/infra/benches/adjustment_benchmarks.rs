use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use stockbook_core::UserId;
use stockbook_inventory::{MovementType, NewInventoryItem};

use stockbook_infra::service::{AdjustStock, AdjustmentService, ItemRegistry};
use stockbook_infra::store::InMemoryStockStore;

fn setup(
    rt: &tokio::runtime::Runtime,
    initial_stock: i64,
) -> (
    AdjustmentService<InMemoryStockStore>,
    stockbook_core::InventoryItemId,
) {
    let store = InMemoryStockStore::new();
    let registry = ItemRegistry::new(store.clone());
    let mut new = NewInventoryItem::new("BENCH-001", "Benchmark Item");
    new.initial_stock = initial_stock;
    let item = rt.block_on(registry.register(new)).unwrap();
    (AdjustmentService::new(store), item.id)
}

/// Latency of a single adjustment through the full locked pipeline
/// (lock, arithmetic, ledger append, alert check, commit).
fn bench_adjustment_latency(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("adjustment_latency");
    group.throughput(Throughput::Elements(1));

    // Receipt + issue in pairs keeps the stock level stable across
    // arbitrarily many iterations.
    let (service, item_id) = setup(&rt, 1_000);
    group.bench_function("receipt_then_issue", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user = UserId::new();
                service
                    .adjust_stock(
                        item_id,
                        AdjustStock::new(MovementType::Receipt, black_box(5), user),
                    )
                    .await
                    .unwrap();
                service
                    .adjust_stock(
                        item_id,
                        AdjustStock::new(MovementType::Issue, black_box(5), user),
                    )
                    .await
                    .unwrap();
            })
        })
    });

    group.finish();
}

/// Reservation churn: reserve/release against one contended item.
fn bench_reservation_churn(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("reservation_churn");

    for batch in [1u32, 16, 64] {
        let (service, item_id) = setup(&rt, 1_000_000);
        group.throughput(Throughput::Elements(batch as u64 * 2));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch),
            &batch,
            |b, &batch| {
                b.iter(|| {
                    rt.block_on(async {
                        for _ in 0..batch {
                            service.reserve_stock(item_id, 3).await.unwrap();
                            service.release_reserved_stock(item_id, 3).await.unwrap();
                        }
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_adjustment_latency, bench_reservation_churn);
criterion_main!(benches);
