use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::debug;

use stockhistory_history::{HistoryQuery, HistoryQueryParams};

use crate::app::routes::PLUGIN_PREFIX;
use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/history/", get(list_history))
}

/// GET /plugin/stock-history/history/?part=N&date_after=..&date_before=..&ordering=-date&limit=..&offset=..
///
/// Bare array without `limit`, paginated envelope with it.
pub async fn list_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<HistoryQueryParams>,
) -> axum::response::Response {
    let query = match HistoryQuery::try_from(&params) {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let page = match services.history.list(&query).await {
        Ok(p) => p,
        Err(e) => return errors::store_error_to_response(e),
    };
    debug!(
        user = principal.username(),
        count = page.count,
        returned = page.results.len(),
        "listed stock history"
    );

    let results: Vec<dto::EntryResponse> = page.results.iter().map(dto::EntryResponse::from).collect();

    match query.page {
        Some(request) => {
            let path = format!("{PLUGIN_PREFIX}/history/");
            Json(dto::paginated(&path, &query, request, page.count, results)).into_response()
        }
        None => Json(results).into_response(),
    }
}
