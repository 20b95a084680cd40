use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::info;

use stockhistory_auth::Permission;

use crate::app::{errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/snapshot/", post(run_snapshot))
}

/// POST /plugin/stock-history/snapshot/
///
/// Records a snapshot now, regardless of the count period.
pub async fn run_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let settings = match services.settings.load().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = authorize_request(&principal, &Permission::RUN_SNAPSHOT, &settings) {
        return errors::authz_error_to_response(e);
    }

    let report = match services.snapshot.run(Utc::now().date_naive(), true).await {
        Ok(r) => r,
        Err(e) => return errors::job_error_to_response(e),
    };
    info!(
        user = principal.username(),
        entries = report.entries_created,
        "manual snapshot recorded"
    );

    Json(report).into_response()
}
