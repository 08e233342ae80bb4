use axum::{Json, extract::State};
use gateway_sdk::objects::SourceKinds;

use crate::state::AppState;

/// `GET /api/v1/sources`: list the source types this server runs.
pub(super) async fn list_sources(State(state): State<AppState>) -> Json<SourceKinds> {
    Json(SourceKinds {
        kinds: state
            .registry
            .kinds()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
