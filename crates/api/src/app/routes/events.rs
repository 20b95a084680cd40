//! Host event intake.
//!
//! The host forwards its model events here. They are published on the
//! in-process bus and handled asynchronously by the hook runner, so the
//! response only acknowledges receipt.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{debug, error};

use stockhistory_auth::Permission;
use stockhistory_events::HostEvent;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/events/", post(post_event))
}

pub async fn post_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::HostEventRequest>,
) -> axum::response::Response {
    let settings = match services.settings.load().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = authorize_request(&principal, &Permission::POST_EVENTS, &settings) {
        return errors::authz_error_to_response(e);
    }

    if body.event.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "event name is required");
    }

    let event = HostEvent::new(body.event, body.args, body.kwargs);
    let event_id = event.event_id;
    debug!(%event_id, name = %event.name, "host event received");

    if let Err(e) = services.publish(event) {
        error!(error = ?e, "failed to publish host event");
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "publish_error",
            format!("{e:?}"),
        );
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "event_id": event_id.to_string() })),
    )
        .into_response()
}
