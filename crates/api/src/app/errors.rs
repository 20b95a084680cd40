use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use stockhistory_auth::AuthzError;
use stockhistory_core::DomainError;
use stockhistory_infra::{JobError, SourceError, StoreError};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    error!(error = %err, "history store failure");
    match err {
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            other.to_string(),
        ),
    }
}

pub fn job_error_to_response(err: JobError) -> axum::response::Response {
    match err {
        JobError::Store(e) => store_error_to_response(e),
        JobError::Source(e) => {
            error!(error = %e, "stock source failure");
            match e {
                SourceError::Unavailable(msg) => {
                    json_error(StatusCode::SERVICE_UNAVAILABLE, "source_unavailable", msg)
                }
                other => json_error(StatusCode::BAD_GATEWAY, "source_error", other.to_string()),
            }
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
