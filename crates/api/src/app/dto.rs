use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stockhistory_core::Money;
use stockhistory_history::{
    HistoryOrdering, HistoryQuery, HistorySettings, PageRequest, SettingDefinition, SortField,
    StockHistoryEntry,
};

// -------------------------
// Request DTOs
// -------------------------

/// Event forwarded by the host.
#[derive(Debug, Deserialize)]
pub struct HostEventRequest {
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

// -------------------------
// Response DTOs
// -------------------------

/// One history record, in the host's serializer shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryResponse {
    pub pk: i64,
    pub part: i64,
    pub date: NaiveDate,
    pub item_count: i64,
    pub quantity: f64,
    pub cost_min: Option<String>,
    pub cost_min_currency: Option<String>,
    pub cost_max: Option<String>,
    pub cost_max_currency: Option<String>,
}

fn amount(money: Option<&Money>) -> Option<String> {
    money.map(|m| m.amount.to_string())
}

fn currency(money: Option<&Money>) -> Option<String> {
    money.map(|m| m.currency.to_string())
}

impl From<&StockHistoryEntry> for EntryResponse {
    fn from(e: &StockHistoryEntry) -> Self {
        Self {
            pk: e.pk.get(),
            part: e.part.get(),
            date: e.date,
            item_count: e.item_count,
            quantity: e.quantity.to_f64().unwrap_or_default(),
            cost_min: amount(e.cost_min.as_ref()),
            cost_min_currency: currency(e.cost_min.as_ref()),
            cost_max: amount(e.cost_max.as_ref()),
            cost_max_currency: currency(e.cost_max.as_ref()),
        }
    }
}

/// Limit/offset page, as the host's list endpoints return them.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub values: Value,
    pub definitions: &'static [SettingDefinition],
}

impl From<&HistorySettings> for SettingsResponse {
    fn from(settings: &HistorySettings) -> Self {
        Self {
            values: settings.to_json(),
            definitions: HistorySettings::definitions(),
        }
    }
}

// -------------------------
// Pagination links
// -------------------------

fn ordering_param(ordering: &HistoryOrdering) -> Option<String> {
    if *ordering == HistoryOrdering::default() {
        return None;
    }
    let field = match ordering.field {
        SortField::Date => "date",
        SortField::Quantity => "quantity",
    };
    Some(if ordering.descending {
        format!("-{field}")
    } else {
        field.to_string()
    })
}

fn page_link(path: &str, query: &HistoryQuery, limit: u32, offset: u32) -> String {
    let mut params = vec![format!("limit={limit}")];
    if offset > 0 {
        params.push(format!("offset={offset}"));
    }
    if let Some(part) = query.filter.part {
        params.push(format!("part={part}"));
    }
    if let Some(d) = query.filter.date_before {
        params.push(format!("date_before={d}"));
    }
    if let Some(d) = query.filter.date_after {
        params.push(format!("date_after={d}"));
    }
    if let Some(o) = ordering_param(&query.ordering) {
        params.push(format!("ordering={o}"));
    }
    format!("{path}?{}", params.join("&"))
}

pub fn paginated<T>(
    path: &str,
    query: &HistoryQuery,
    page: PageRequest,
    count: u64,
    results: Vec<T>,
) -> PaginatedResponse<T> {
    let end = u64::from(page.offset) + u64::from(page.limit);
    let next = (page.limit > 0 && end < count)
        .then(|| page_link(path, query, page.limit, page.offset + page.limit));
    let previous = (page.offset > 0)
        .then(|| page_link(path, query, page.limit, page.offset.saturating_sub(page.limit)));

    PaginatedResponse {
        count,
        next,
        previous,
        results,
    }
}
