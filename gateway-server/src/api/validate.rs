use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use gateway_core::Validation;
use gateway_sdk::objects::{EventSource, ValidationResult};

use super::ApiError;
use crate::state::AppState;

/// `POST /api/v1/sources/{kind}/validate`: validate an event source.
///
/// - `200` with the result when there is no hard error, including
///   payloads that failed to parse;
/// - `422` with the result when the payload breaks the source type's rules;
/// - `404` when no executor is registered for `kind`.
///
/// The body is decoded by hand so that a malformed envelope still yields
/// a structured result instead of an extractor rejection.
pub(super) async fn validate_event_source(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let executor = state.registry.get(&kind)?;

    let source: EventSource = match serde_json::from_slice(&body) {
        Ok(source) => source,
        Err(e) => {
            tracing::debug!(kind = %kind, error = %e, "Malformed validation request");
            let result = ValidationResult::invalid(format!("malformed event source: {e}"));
            return Ok((StatusCode::OK, Json(result)).into_response());
        }
    };

    let Validation { result, error } = executor.validate_event_source(&source).await;
    match error {
        None => {
            tracing::debug!(
                kind = %kind,
                event_source = %source.name,
                is_valid = result.is_valid,
                "Validated event source"
            );
            Ok((StatusCode::OK, Json(result)).into_response())
        }
        Some(e) => {
            tracing::info!(
                kind = %kind,
                event_source = %source.name,
                error = %e,
                "Rejected event source"
            );
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response())
        }
    }
}
