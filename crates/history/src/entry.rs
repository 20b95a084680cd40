use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockhistory_core::{DomainError, DomainResult, Entity, EntryId, Money, PartId};

/// Decimal places kept for quantities (matches the `NUMERIC(19, 5)` column).
pub const QUANTITY_SCALE: u32 = 5;

/// Largest magnitude a `NUMERIC(19, 5)` column can hold.
fn quantity_limit() -> Decimal {
    Decimal::new(100_000_000_000_000, 0)
}

/// Recorded stock level of one part on one date.
///
/// - `quantity` is the total available stock across `item_count` stock items
/// - `cost_min` / `cost_max` estimate the value of that stock on hand
///
/// Entries are immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub pk: EntryId,
    pub part: PartId,
    pub item_count: i64,
    pub quantity: Decimal,
    pub date: NaiveDate,
    pub cost_min: Option<Money>,
    pub cost_max: Option<Money>,
}

impl Entity for StockHistoryEntry {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.pk
    }
}

/// Insert form of an entry: no primary key yet.
///
/// `date` is normally left empty so the store stamps the current date; the
/// legacy back-fill supplies the original date instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockHistoryEntry {
    part: PartId,
    item_count: i64,
    quantity: Decimal,
    date: Option<NaiveDate>,
    cost_min: Option<Money>,
    cost_max: Option<Money>,
}

impl NewStockHistoryEntry {
    pub fn new(part: PartId, item_count: i64, quantity: Decimal) -> DomainResult<Self> {
        if item_count < 0 {
            return Err(DomainError::validation("item_count cannot be negative"));
        }
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        let quantity = quantity.round_dp(QUANTITY_SCALE);
        if quantity >= quantity_limit() {
            return Err(DomainError::validation("quantity exceeds 14 integer digits"));
        }

        Ok(Self {
            part,
            item_count,
            quantity,
            date: None,
            cost_min: None,
            cost_max: None,
        })
    }

    pub fn with_costs(mut self, cost_min: Option<Money>, cost_max: Option<Money>) -> Self {
        self.cost_min = cost_min;
        self.cost_max = cost_max;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn part(&self) -> PartId {
        self.part
    }

    pub fn item_count(&self) -> i64 {
        self.item_count
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn cost_min(&self) -> Option<&Money> {
        self.cost_min.as_ref()
    }

    pub fn cost_max(&self) -> Option<&Money> {
        self.cost_max.as_ref()
    }

    /// Materialise the stored entry. `today` is used when no date was given.
    pub fn into_entry(self, pk: EntryId, today: NaiveDate) -> StockHistoryEntry {
        StockHistoryEntry {
            pk,
            part: self.part,
            item_count: self.item_count,
            quantity: self.quantity,
            date: self.date.unwrap_or(today),
            cost_min: self.cost_min,
            cost_max: self.cost_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rejects_negative_quantity() {
        let err = NewStockHistoryEntry::new(PartId::new(1), 1, dec("-0.5")).unwrap_err();
        assert_eq!(err, DomainError::validation("quantity cannot be negative"));
    }

    #[test]
    fn rejects_negative_item_count() {
        assert!(NewStockHistoryEntry::new(PartId::new(1), -1, dec("1")).is_err());
    }

    #[test]
    fn rounds_quantity_to_column_scale() {
        let e = NewStockHistoryEntry::new(PartId::new(1), 1, dec("1.1234567")).unwrap();
        assert_eq!(e.quantity(), dec("1.12346"));
    }

    #[test]
    fn rejects_quantities_that_overflow_the_column() {
        assert!(NewStockHistoryEntry::new(PartId::new(1), 1, dec("100000000000000")).is_err());
        assert!(NewStockHistoryEntry::new(PartId::new(1), 1, dec("99999999999999.99999")).is_ok());
    }

    #[test]
    fn store_date_is_used_unless_supplied() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 24).unwrap();
        let legacy = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let fresh = NewStockHistoryEntry::new(PartId::new(1), 1, dec("3"))
            .unwrap()
            .into_entry(EntryId::new(1), today);
        assert_eq!(fresh.date, today);

        let backfilled = NewStockHistoryEntry::new(PartId::new(1), 1, dec("3"))
            .unwrap()
            .with_date(legacy)
            .into_entry(EntryId::new(2), today);
        assert_eq!(backfilled.date, legacy);
        assert_eq!(*backfilled.id(), EntryId::new(2));
    }
}
