use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::debug;

use stockhistory_auth::Permission;
use stockhistory_history::{PanelRequest, UiPanel, panels_for};

use crate::app::{errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/panels/", get(get_panels))
}

/// GET /plugin/stock-history/panels/?target_model=part&target_id=N
///
/// Callers outside the configured group get no panel rather than an error,
/// so the host page still renders.
pub async fn get_panels(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(request): Query<PanelRequest>,
) -> axum::response::Response {
    let settings = match services.settings.load().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_to_response(e),
    };

    if settings.user_group.is_some() {
        if let Err(e) = authorize_request(&principal, &Permission::VIEW_HISTORY, &settings) {
            debug!(user = principal.username(), reason = %e, "stock history panel hidden");
            return Json(Vec::<UiPanel>::new()).into_response();
        }
    }

    Json(panels_for(&request, &settings)).into_response()
}
