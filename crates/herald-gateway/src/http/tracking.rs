//! Engagement-tracking endpoints: POST /tracking, GET/DELETE /tracking/{user_id}.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use herald_tracker::TrackerError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackingInput {
    pub user_id: String,
    /// Topic name: `i`, a counter, `med_rem_startdate`, or a module name.
    pub topic_name: String,
    #[serde(default)]
    pub query_value: Option<String>,
    pub time_point: String,
}

/// POST /tracking — apply one engagement update.
pub async fn record_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TrackingInput>,
) -> (StatusCode, Json<Value>) {
    info!(
        user_id = %input.user_id,
        topic_name = %input.topic_name,
        "received tracking update"
    );

    match state.tracker.record(
        &input.user_id,
        &input.topic_name,
        input.query_value.as_deref(),
        &input.time_point,
    ) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "tracking updated" })),
        ),
        Err(e) => error_response(e),
    }
}

/// GET /tracking/{user_id} — full engagement document.
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.tracker.get(&user_id) {
        Ok(Some(entry)) => (StatusCode::OK, Json(json!({ "entry": entry }))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no user entry", "code": "NOT_FOUND" })),
        ),
        Err(e) => error_response(e),
    }
}

/// DELETE /tracking/{user_id} — drop the engagement document.
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.tracker.delete(&user_id) {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({ "message": "tracking entry deleted" })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no user entry", "code": "NOT_FOUND" })),
        ),
        Err(e) => error_response(e),
    }
}

fn error_response(e: TrackerError) -> (StatusCode, Json<Value>) {
    let (status, code) = match &e {
        TrackerError::AlreadyInitialized { .. } => (StatusCode::CONFLICT, "ALREADY_INITIALIZED"),
        TrackerError::UserNotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        TrackerError::UnknownTopic { .. }
        | TrackerError::InvalidStatus(_)
        | TrackerError::MissingValue { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        TrackerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
    };
    (status, Json(json!({ "error": e.to_string(), "code": code })))
}
