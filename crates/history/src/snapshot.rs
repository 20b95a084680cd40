//! Point-in-time stock aggregation.
//!
//! Input is a read of the host's live stock data (`StockSnapshot`); output is
//! one `NewStockHistoryEntry` per eligible part. Pure and deterministic: the
//! same input always yields the same entries, in part-id order.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use stockhistory_core::{Currency, ExchangeRates, Money, PartId};

use crate::entry::NewStockHistoryEntry;
use crate::settings::HistorySettings;

/// Pricing range the host has computed for a part (per unit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartPricing {
    pub min: Option<Money>,
    pub max: Option<Money>,
}

/// A part as seen by the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    pub id: PartId,
    pub active: bool,
    /// Virtual parts never hold stock.
    pub is_virtual: bool,
    pub pricing: PartPricing,
}

impl PartRecord {
    pub fn new(id: PartId) -> Self {
        Self {
            id,
            active: true,
            is_virtual: false,
            pricing: PartPricing::default(),
        }
    }
}

/// A stock item as seen by the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItemRecord {
    pub part: PartId,
    pub quantity: Decimal,
    /// False when the item is allocated to a customer, a build or a parent item.
    pub in_stock: bool,
    /// True when the item's location is flagged as external.
    pub external_location: bool,
    pub purchase_price: Option<Money>,
}

impl StockItemRecord {
    pub fn new(part: PartId, quantity: Decimal) -> Self {
        Self {
            part,
            quantity,
            in_stock: true,
            external_location: false,
            purchase_price: None,
        }
    }
}

/// Everything the aggregation needs, read in one go from the stock source.
#[derive(Debug, Clone, Default)]
pub struct StockSnapshot {
    pub parts: Vec<PartRecord>,
    pub items: Vec<StockItemRecord>,
    pub rates: ExchangeRates,
}

/// Outcome of a snapshot run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub parts_examined: usize,
    pub parts_skipped: usize,
    pub entries_created: usize,
    /// Items whose value could not be determined (no price or no rate).
    pub unpriced_items: usize,
    /// True when the period gate stopped the run before anything was read.
    pub not_due: bool,
}

impl SnapshotReport {
    pub fn not_due() -> Self {
        Self {
            not_due: true,
            ..Self::default()
        }
    }
}

/// Whether a new snapshot should be recorded on `today`.
///
/// Due when there is no previous snapshot, or when the latest one is at least
/// `period_days` old.
pub fn snapshot_due(last: Option<NaiveDate>, today: NaiveDate, period_days: u32) -> bool {
    match last {
        None => true,
        Some(last) => today - last >= Duration::days(i64::from(period_days)),
    }
}

#[derive(Default)]
struct Tally {
    item_count: i64,
    quantity: Decimal,
    cost_min: Option<Money>,
    cost_max: Option<Money>,
}

/// Add `value` to a running total; false (and the total untouched) on overflow.
fn accumulate(total: &mut Option<Money>, value: Money) -> bool {
    let next = match total.as_ref() {
        Some(sum) => sum.checked_add(&value),
        None => Ok(value),
    };
    match next {
        Ok(sum) => {
            *total = Some(sum);
            true
        }
        Err(_) => false,
    }
}

/// Value of one stock item in the target currency, if it can be determined
/// (a price, a rate, and a product that fits in a `Decimal`).
fn item_value(
    unit: Option<&Money>,
    quantity: Decimal,
    rates: &ExchangeRates,
    currency: &Currency,
) -> Option<Money> {
    rates.convert(unit?, currency)?.checked_times(quantity)
}

/// Aggregate current stock into one history entry per eligible part.
///
/// - Virtual parts are skipped; inactive parts too when `IGNORE_INACTIVE_PARTS` is set.
/// - Only in-stock items with positive quantity count; items in external
///   locations are dropped when `EXCLUDE_EXTERNAL_LOCATIONS` is set.
/// - Each item is valued at its purchase price, falling back to the part's
///   pricing range, converted to `DEFAULT_CURRENCY`.
/// - Parts without countable stock still get an entry with zero quantity.
pub fn build_snapshot(
    snapshot: &StockSnapshot,
    settings: &HistorySettings,
) -> (Vec<NewStockHistoryEntry>, SnapshotReport) {
    let currency = &settings.default_currency;
    let mut report = SnapshotReport::default();

    let mut eligible: BTreeMap<PartId, (&PartRecord, Tally)> = BTreeMap::new();
    for part in &snapshot.parts {
        report.parts_examined += 1;
        if part.is_virtual || (settings.ignore_inactive_parts && !part.active) {
            report.parts_skipped += 1;
            continue;
        }
        eligible.insert(part.id, (part, Tally::default()));
    }

    for item in &snapshot.items {
        if !item.in_stock || item.quantity <= Decimal::ZERO {
            continue;
        }
        if settings.exclude_external_locations && item.external_location {
            continue;
        }
        let Some((part, tally)) = eligible.get_mut(&item.part) else {
            continue;
        };

        let Some(quantity) = tally.quantity.checked_add(item.quantity) else {
            tracing::warn!(part = %item.part, "stock quantity overflow; item not counted");
            continue;
        };
        tally.item_count += 1;
        tally.quantity = quantity;

        let unit_min = item.purchase_price.as_ref().or(part.pricing.min.as_ref());
        let unit_max = item.purchase_price.as_ref().or(part.pricing.max.as_ref());
        let priced_min = item_value(unit_min, item.quantity, &snapshot.rates, currency)
            .is_some_and(|v| accumulate(&mut tally.cost_min, v));
        let priced_max = item_value(unit_max, item.quantity, &snapshot.rates, currency)
            .is_some_and(|v| accumulate(&mut tally.cost_max, v));

        if !priced_min && !priced_max {
            report.unpriced_items += 1;
        }
    }

    let mut entries = Vec::with_capacity(eligible.len());
    for (part_id, (_, tally)) in eligible {
        let quantity = tally.quantity.max(Decimal::ZERO);
        match NewStockHistoryEntry::new(part_id, tally.item_count, quantity) {
            Ok(entry) => entries.push(entry.with_costs(tally.cost_min, tally.cost_max)),
            Err(e) => {
                tracing::warn!(part = %part_id, error = %e, "skipping part with unrecordable stock");
                report.parts_skipped += 1;
            }
        }
    }

    report.entries_created = entries.len();
    (entries, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn usd(s: &str) -> Money {
        Money::new(dec(s), Currency::usd())
    }

    fn find(entries: &[NewStockHistoryEntry], id: i64) -> &NewStockHistoryEntry {
        entries.iter().find(|e| e.part() == PartId::new(id)).unwrap()
    }

    #[test]
    fn sums_quantity_and_counts_items_per_part() {
        let snapshot = StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(1)), PartRecord::new(PartId::new(2))],
            items: vec![
                StockItemRecord::new(PartId::new(1), dec("2.5")),
                StockItemRecord::new(PartId::new(1), dec("4")),
                StockItemRecord::new(PartId::new(2), dec("1")),
            ],
            rates: ExchangeRates::new(Currency::usd()),
        };

        let (entries, report) = build_snapshot(&snapshot, &HistorySettings::default());
        assert_eq!(report.entries_created, 2);

        let p1 = find(&entries, 1);
        assert_eq!(p1.item_count(), 2);
        assert_eq!(p1.quantity(), dec("6.5"));
        assert_eq!(find(&entries, 2).quantity(), dec("1"));
    }

    #[test]
    fn parts_without_stock_record_zero() {
        let snapshot = StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(9))],
            items: vec![StockItemRecord::new(PartId::new(9), dec("-3"))],
            ..Default::default()
        };
        let (entries, _) = build_snapshot(&snapshot, &HistorySettings::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_count(), 0);
        assert_eq!(entries[0].quantity(), Decimal::ZERO);
        assert_eq!(entries[0].cost_min(), None);
    }

    #[test]
    fn inactive_parts_follow_the_setting() {
        let mut inactive = PartRecord::new(PartId::new(1));
        inactive.active = false;
        let snapshot = StockSnapshot {
            parts: vec![inactive],
            ..Default::default()
        };

        let mut settings = HistorySettings::default();
        let (entries, report) = build_snapshot(&snapshot, &settings);
        assert!(entries.is_empty());
        assert_eq!(report.parts_skipped, 1);

        settings.ignore_inactive_parts = false;
        let (entries, _) = build_snapshot(&snapshot, &settings);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn virtual_parts_are_always_skipped() {
        let mut part = PartRecord::new(PartId::new(1));
        part.is_virtual = true;
        let snapshot = StockSnapshot {
            parts: vec![part],
            ..Default::default()
        };
        let (entries, _) = build_snapshot(&snapshot, &HistorySettings::default());
        assert!(entries.is_empty());
    }

    #[test]
    fn external_locations_follow_the_setting() {
        let mut external = StockItemRecord::new(PartId::new(1), dec("5"));
        external.external_location = true;
        let snapshot = StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(1))],
            items: vec![external, StockItemRecord::new(PartId::new(1), dec("1"))],
            ..Default::default()
        };

        let mut settings = HistorySettings::default();
        let (entries, _) = build_snapshot(&snapshot, &settings);
        assert_eq!(entries[0].quantity(), dec("1"));

        settings.exclude_external_locations = false;
        let (entries, _) = build_snapshot(&snapshot, &settings);
        assert_eq!(entries[0].quantity(), dec("6"));
        assert_eq!(entries[0].item_count(), 2);
    }

    #[test]
    fn allocated_items_are_not_counted() {
        let mut allocated = StockItemRecord::new(PartId::new(1), dec("10"));
        allocated.in_stock = false;
        let snapshot = StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(1))],
            items: vec![allocated],
            ..Default::default()
        };
        let (entries, _) = build_snapshot(&snapshot, &HistorySettings::default());
        assert_eq!(entries[0].item_count(), 0);
    }

    #[test]
    fn values_items_by_purchase_price_then_part_pricing() {
        let mut part = PartRecord::new(PartId::new(1));
        part.pricing = PartPricing {
            min: Some(usd("1")),
            max: Some(usd("3")),
        };

        let mut bought = StockItemRecord::new(PartId::new(1), dec("2"));
        bought.purchase_price = Some(usd("5"));
        let unpriced = StockItemRecord::new(PartId::new(1), dec("10"));

        let snapshot = StockSnapshot {
            parts: vec![part],
            items: vec![bought, unpriced],
            rates: ExchangeRates::new(Currency::usd()),
        };

        let (entries, report) = build_snapshot(&snapshot, &HistorySettings::default());
        let e = &entries[0];
        // 2 * 5 + 10 * 1 and 2 * 5 + 10 * 3
        assert_eq!(e.cost_min(), Some(&usd("20")));
        assert_eq!(e.cost_max(), Some(&usd("40")));
        assert_eq!(report.unpriced_items, 0);
    }

    #[test]
    fn converts_foreign_prices_and_counts_unconvertible_ones() {
        let eur = Currency::new("EUR").unwrap();
        let gbp = Currency::new("GBP").unwrap();

        let mut in_eur = StockItemRecord::new(PartId::new(1), dec("1"));
        in_eur.purchase_price = Some(Money::new(dec("10"), eur.clone()));
        let mut in_gbp = StockItemRecord::new(PartId::new(1), dec("1"));
        in_gbp.purchase_price = Some(Money::new(dec("10"), gbp));

        let snapshot = StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(1))],
            items: vec![in_eur, in_gbp],
            rates: ExchangeRates::new(Currency::usd()).with_rate(eur, dec("0.5")),
        };

        let (entries, report) = build_snapshot(&snapshot, &HistorySettings::default());
        assert_eq!(entries[0].cost_min(), Some(&usd("20")));
        assert_eq!(entries[0].item_count(), 2);
        assert_eq!(report.unpriced_items, 1);
    }

    #[test]
    fn overflowing_valuation_counts_as_unpriced() {
        let xau = Currency::new("XAU").unwrap();

        let mut bullion = StockItemRecord::new(PartId::new(1), dec("9999999999.99999"));
        bullion.purchase_price = Some(Money::new(dec("9999999999999.999999"), xau.clone()));
        let mut plain = StockItemRecord::new(PartId::new(1), dec("2"));
        plain.purchase_price = Some(usd("3"));

        let snapshot = StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(1))],
            items: vec![bullion, plain],
            rates: ExchangeRates::new(Currency::usd()).with_rate(xau, dec("0.000001")),
        };

        let (entries, report) = build_snapshot(&snapshot, &HistorySettings::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_count(), 2);
        assert_eq!(entries[0].quantity(), dec("10000000001.99999"));
        assert_eq!(entries[0].cost_min(), Some(&usd("6")));
        assert_eq!(report.unpriced_items, 1);
    }

    #[test]
    fn snapshot_due_respects_period() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        assert!(snapshot_due(None, today, 7));
        assert!(snapshot_due(Some(today - Duration::days(7)), today, 7));
        assert!(!snapshot_due(Some(today - Duration::days(6)), today, 7));
        assert!(!snapshot_due(Some(today), today, 1));
    }

    proptest! {
        #[test]
        fn recorded_quantity_is_never_negative(
            quantities in proptest::collection::vec(-1_000i64..1_000, 0..20),
        ) {
            let items = quantities
                .iter()
                .map(|q| StockItemRecord::new(PartId::new(1), Decimal::from(*q)))
                .collect();
            let snapshot = StockSnapshot {
                parts: vec![PartRecord::new(PartId::new(1))],
                items,
                ..Default::default()
            };

            let (entries, _) = build_snapshot(&snapshot, &HistorySettings::default());
            prop_assert_eq!(entries.len(), 1);
            prop_assert!(entries[0].quantity() >= Decimal::ZERO);

            let positive = quantities.iter().filter(|q| **q > 0).count() as i64;
            prop_assert_eq!(entries[0].item_count(), positive);
        }
    }
}
