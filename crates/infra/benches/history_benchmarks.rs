use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stockhistory_core::{Currency, Money, PartId};
use stockhistory_history::{
    HistoryQuery, HistorySettings, NewStockHistoryEntry, PageRequest, PartRecord, StockItemRecord,
    StockSnapshot, build_snapshot,
};
use stockhistory_infra::{HistoryStore, InMemoryHistoryStore};

/// `parts` parts with `items_per_part` priced stock items each.
fn host_stock(parts: i64, items_per_part: i64) -> StockSnapshot {
    let mut snapshot = StockSnapshot::default();
    for id in 1..=parts {
        snapshot.parts.push(PartRecord::new(PartId::new(id)));
        for n in 0..items_per_part {
            let mut item = StockItemRecord::new(PartId::new(id), Decimal::from(n + 1));
            item.purchase_price = Some(Money::new(Decimal::new(125, 2), Currency::usd()));
            snapshot.items.push(item);
        }
    }
    snapshot
}

fn bench_snapshot_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_aggregation");
    let settings = HistorySettings::default();

    for parts in [100_i64, 1_000, 10_000] {
        let stock = host_stock(parts, 5);
        group.throughput(Throughput::Elements(stock.items.len() as u64));
        group.bench_with_input(BenchmarkId::new("build_snapshot", parts), &stock, |b, stock| {
            b.iter(|| build_snapshot(black_box(stock), &settings));
        });
    }

    group.finish();
}

fn bench_history_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_listing");
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for days in [30_u64, 365] {
        let store = InMemoryHistoryStore::new();
        let rows: Vec<NewStockHistoryEntry> = (0..days)
            .flat_map(|d| {
                let date = start + chrono::Days::new(d);
                (1..=50).map(move |part| {
                    NewStockHistoryEntry::new(PartId::new(part), 1, Decimal::from(d))
                        .unwrap()
                        .with_date(date)
                })
            })
            .collect();
        rt.block_on(store.insert_many(rows)).unwrap();

        let mut query = HistoryQuery::default();
        query.filter.part = Some(PartId::new(7));
        query.page = Some(PageRequest::new(25, 0));

        group.bench_with_input(BenchmarkId::new("one_part_first_page", days), &query, |b, query| {
            b.iter(|| rt.block_on(store.list(black_box(query))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_snapshot_aggregation, bench_history_listing);
criterion_main!(benches);
