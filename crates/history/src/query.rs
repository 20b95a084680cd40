//! Filtering, ordering and pagination of history entries.
//!
//! The same `HistoryQuery` is evaluated in memory (`HistoryQuery::evaluate`)
//! and translated to SQL by the Postgres store, so both must agree on:
//! - `date_before` / `date_after` are strict bounds
//! - default order is ascending by date, ties broken by primary key

use core::cmp::Ordering;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockhistory_core::{DomainError, DomainResult, PartId};

use crate::entry::StockHistoryEntry;

/// Raw query-string parameters of the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryQueryParams {
    pub part: Option<String>,
    pub date_before: Option<String>,
    pub date_after: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub part: Option<PartId>,
    /// Keep entries dated strictly before this date.
    pub date_before: Option<NaiveDate>,
    /// Keep entries dated strictly after this date.
    pub date_after: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn for_part(part: PartId) -> Self {
        Self {
            part: Some(part),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &StockHistoryEntry) -> bool {
        if self.part.is_some_and(|p| p != entry.part) {
            return false;
        }
        if self.date_before.is_some_and(|d| entry.date >= d) {
            return false;
        }
        if self.date_after.is_some_and(|d| entry.date <= d) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Date,
    Quantity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryOrdering {
    pub field: SortField,
    pub descending: bool,
}

impl HistoryOrdering {
    pub fn compare(&self, a: &StockHistoryEntry, b: &StockHistoryEntry) -> Ordering {
        let primary = match self.field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Quantity => a.quantity.cmp(&b.quantity),
        };
        let primary = if self.descending { primary.reverse() } else { primary };
        primary.then_with(|| a.pk.cmp(&b.pk))
    }

    /// `ORDER BY` clause for the entry table.
    pub fn sql(&self) -> &'static str {
        match (self.field, self.descending) {
            (SortField::Date, false) => "date ASC, id ASC",
            (SortField::Date, true) => "date DESC, id ASC",
            (SortField::Quantity, false) => "quantity ASC, id ASC",
            (SortField::Quantity, true) => "quantity DESC, id ASC",
        }
    }
}

impl FromStr for HistoryOrdering {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "date" => SortField::Date,
            "quantity" => SortField::Quantity,
            other => {
                return Err(DomainError::validation(format!(
                    "ordering: '{other}' is not one of date, quantity"
                )));
            }
        };
        Ok(Self { field, descending })
    }
}

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.min(Self::MAX_LIMIT),
            offset,
        }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub count: u64,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub filter: HistoryFilter,
    pub ordering: HistoryOrdering,
    /// `None` returns every match.
    pub page: Option<PageRequest>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(name: &str, raw: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DomainError::validation(format!("{name}: '{raw}' is not a YYYY-MM-DD date")))
}

fn parse_count(name: &str, raw: &str) -> DomainResult<u32> {
    raw.parse()
        .map_err(|_| DomainError::validation(format!("{name}: '{raw}' is not a non-negative integer")))
}

impl TryFrom<&HistoryQueryParams> for HistoryQuery {
    type Error = DomainError;

    /// Empty parameters are treated as absent, as the host's filters do.
    fn try_from(params: &HistoryQueryParams) -> Result<Self, Self::Error> {
        let part = non_empty(&params.part)
            .map(|raw| {
                raw.parse::<PartId>()
                    .map_err(|_| DomainError::validation(format!("part: '{raw}' is not a valid part id")))
            })
            .transpose()?;
        let date_before = non_empty(&params.date_before)
            .map(|raw| parse_date("date_before", raw))
            .transpose()?;
        let date_after = non_empty(&params.date_after)
            .map(|raw| parse_date("date_after", raw))
            .transpose()?;
        let ordering = non_empty(&params.ordering)
            .map(str::parse::<HistoryOrdering>)
            .transpose()?
            .unwrap_or_default();

        let page = match non_empty(&params.limit) {
            Some(raw) => {
                let limit = parse_count("limit", raw)?;
                let offset = non_empty(&params.offset)
                    .map(|raw| parse_count("offset", raw))
                    .transpose()?
                    .unwrap_or(0);
                Some(PageRequest::new(limit, offset))
            }
            None => None,
        };

        Ok(Self {
            filter: HistoryFilter {
                part,
                date_before,
                date_after,
            },
            ordering,
            page,
        })
    }
}

impl HistoryQuery {
    /// Evaluate against an in-memory collection.
    pub fn evaluate<'a>(&self, entries: impl IntoIterator<Item = &'a StockHistoryEntry>) -> Page<StockHistoryEntry> {
        let mut matched: Vec<StockHistoryEntry> = entries
            .into_iter()
            .filter(|e| self.filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| self.ordering.compare(a, b));

        let count = matched.len() as u64;
        let results = match self.page {
            Some(page) => matched
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect(),
            None => matched,
        };

        Page { count, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use stockhistory_core::EntryId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn entry(pk: i64, part: i64, d: u32, qty: i64) -> StockHistoryEntry {
        StockHistoryEntry {
            pk: EntryId::new(pk),
            part: PartId::new(part),
            item_count: 1,
            quantity: Decimal::from(qty),
            date: day(d),
            cost_min: None,
            cost_max: None,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HistoryQueryParams {
        let mut p = HistoryQueryParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "part" => p.part = v,
                "date_before" => p.date_before = v,
                "date_after" => p.date_after = v,
                "ordering" => p.ordering = v,
                "limit" => p.limit = v,
                "offset" => p.offset = v,
                _ => unreachable!(),
            }
        }
        p
    }

    fn pks(page: &Page<StockHistoryEntry>) -> Vec<i64> {
        page.results.iter().map(|e| e.pk.get()).collect()
    }

    #[test]
    fn date_bounds_are_strict() {
        let data = vec![entry(1, 1, 1, 5), entry(2, 1, 2, 5), entry(3, 1, 3, 5)];

        let q = HistoryQuery::try_from(&params(&[("date_before", "2025-05-02")])).unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![1]);

        let q = HistoryQuery::try_from(&params(&[("date_after", "2025-05-02")])).unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![3]);

        let q = HistoryQuery::try_from(&params(&[("date_after", "2025-05-01"), ("date_before", "2025-05-03")]))
            .unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![2]);
    }

    #[test]
    fn default_order_is_date_ascending() {
        let data = vec![entry(1, 1, 3, 1), entry(2, 1, 1, 9), entry(3, 1, 2, 4)];
        let q = HistoryQuery::try_from(&HistoryQueryParams::default()).unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![2, 3, 1]);
    }

    #[test]
    fn orders_by_quantity_both_ways() {
        let data = vec![entry(1, 1, 3, 1), entry(2, 1, 1, 9), entry(3, 1, 2, 4)];

        let q = HistoryQuery::try_from(&params(&[("ordering", "quantity")])).unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![1, 3, 2]);

        let q = HistoryQuery::try_from(&params(&[("ordering", "-quantity")])).unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![2, 3, 1]);
    }

    #[test]
    fn filters_by_part() {
        let data = vec![entry(1, 1, 1, 1), entry(2, 2, 1, 1)];
        let q = HistoryQuery::try_from(&params(&[("part", "2")])).unwrap();
        assert_eq!(pks(&q.evaluate(&data)), vec![2]);
    }

    #[test]
    fn paginates_after_filtering() {
        let data: Vec<_> = (1..=5).map(|i| entry(i, 1, i as u32, 1)).collect();
        let q = HistoryQuery::try_from(&params(&[("limit", "2"), ("offset", "1")])).unwrap();
        let page = q.evaluate(&data);
        assert_eq!(page.count, 5);
        assert_eq!(pks(&page), vec![2, 3]);
    }

    #[test]
    fn empty_params_are_ignored() {
        let q = HistoryQuery::try_from(&params(&[("part", ""), ("date_before", " ")])).unwrap();
        assert_eq!(q, HistoryQuery::default());
    }

    #[test]
    fn malformed_params_are_rejected() {
        assert!(HistoryQuery::try_from(&params(&[("part", "abc")])).is_err());
        assert!(HistoryQuery::try_from(&params(&[("date_after", "05/02/2025")])).is_err());
        assert!(HistoryQuery::try_from(&params(&[("ordering", "item_count")])).is_err());
        assert!(HistoryQuery::try_from(&params(&[("limit", "-1")])).is_err());
    }

    #[test]
    fn limit_is_capped() {
        let q = HistoryQuery::try_from(&params(&[("limit", "50000")])).unwrap();
        assert_eq!(q.page.unwrap().limit, PageRequest::MAX_LIMIT);
    }
}
