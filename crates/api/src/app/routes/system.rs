use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().get(),
        "username": principal.username(),
        "groups": principal.groups().iter().map(|g| g.as_str()).collect::<Vec<_>>(),
        "is_staff": principal.is_staff(),
    }))
}
