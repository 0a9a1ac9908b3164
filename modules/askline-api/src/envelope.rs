// Uniform `{success, message|data}` JSON envelope for every REST response,
// including errors. Server-side failures never leak internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use askline_common::AsklineError;

pub fn data(value: impl Serialize) -> Response {
    Json(json!({ "success": true, "data": value })).into_response()
}

pub fn message(text: impl Into<String>) -> Response {
    Json(json!({ "success": true, "message": text.into() })).into_response()
}

pub fn reject(status: StatusCode, text: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "message": text.into() })),
    )
        .into_response()
}

/// Handler error wrapper so `?` works on store and workflow calls.
pub struct ApiError(pub AsklineError);

impl From<AsklineError> for ApiError {
    fn from(e: AsklineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let e = self.0;
        let status = match &e {
            AsklineError::NotFound(_) => StatusCode::NOT_FOUND,
            AsklineError::ReconcileInFlight => StatusCode::CONFLICT,
            AsklineError::AiUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %e, "Request failed");
            return reject(status, "internal error");
        }
        reject(status, e.to_string())
    }
}

pub type ApiResult = Result<Response, ApiError>;
