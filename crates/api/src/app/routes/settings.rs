use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::info;

use stockhistory_auth::Permission;
use stockhistory_history::SettingsPatch;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/settings/", get(get_settings).patch(update_settings))
}

pub async fn get_settings(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.settings.load().await {
        Ok(settings) => Json(dto::SettingsResponse::from(&settings)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PATCH /plugin/stock-history/settings/ with a partial `{KEY: value}` object.
///
/// Every key is validated before anything is saved.
pub async fn update_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let current = match services.settings.load().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = authorize_request(&principal, &Permission::CHANGE_SETTINGS, &current) {
        return errors::authz_error_to_response(e);
    }

    let patch = match body {
        Value::Object(map) => SettingsPatch(map),
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "settings patch must be a JSON object",
            );
        }
    };

    let next = match current.apply(&patch) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.settings.save(&next).await {
        return errors::store_error_to_response(e);
    }
    info!(
        user = principal.username(),
        keys = ?patch.0.keys().collect::<Vec<_>>(),
        "plugin settings updated"
    );

    Json(dto::SettingsResponse::from(&next)).into_response()
}
