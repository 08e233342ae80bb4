//! Eventing API handlers.
//!
//! # Endpoints
//!
//! - `GET  /api/v1/sources`                 – list registered source types
//! - `POST /api/v1/sources/{kind}/validate` – validate an event source
//! - `GET  /api/v1/sources/{kind}/stream`   – WebSocket event stream

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gateway_core::ExecutorError;
use gateway_sdk::objects::{ErrorCategory, ErrorResponse};

use crate::state::AppState;

mod sources;
mod stream;
mod validate;

/// Build the Eventing API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/sources", get(sources::list_sources))
        .route(
            "/api/v1/sources/{kind}/validate",
            post(validate::validate_event_source),
        )
        .route(
            "/api/v1/sources/{kind}/stream",
            get(stream::event_stream),
        )
}

/// Error returned by the non-streaming handlers.
#[derive(Debug)]
pub(crate) struct ApiError(ExecutorError);

impl From<ExecutorError> for ApiError {
    fn from(e: ExecutorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let category = self.0.category();
        let status = match category {
            ErrorCategory::UnknownSourceType => StatusCode::NOT_FOUND,
            ErrorCategory::EmptySource
            | ErrorCategory::ParseFailure
            | ErrorCategory::InvalidSource => StatusCode::BAD_REQUEST,
            ErrorCategory::Connection => StatusCode::BAD_GATEWAY,
            ErrorCategory::ListenerFault | ErrorCategory::Stream => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            category,
            reason: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
