//! Scheduling endpoints: POST/DELETE/GET /v1.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use herald_core::command::{CancelCommand, QueryCommand, ScheduleCommand};
use herald_scheduler::{CancelOutcome, SchedulerError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;

/// Request body shared by schedule and cancel (`query_value` is the
/// reminder qualifier, kept under its wire name).
#[derive(Debug, Deserialize)]
pub struct SchedulerInput {
    pub user_id: String,
    pub intent_name: String,
    pub query_value: String,
    #[serde(default)]
    pub time_point: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub user_id: String,
    pub intent_name: String,
    pub query_value: String,
}

/// POST /v1 — schedule a reminder.
pub async fn schedule_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SchedulerInput>,
) -> (StatusCode, Json<Value>) {
    info!(
        user_id = %input.user_id,
        intent_name = %input.intent_name,
        query_value = %input.query_value,
        "received schedule request"
    );

    let Some(time_point) = input.time_point else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "time_point is required", "code": "PARSE_ERROR" })),
        );
    };

    let cmd = ScheduleCommand {
        user_id: input.user_id,
        intent_name: input.intent_name,
        qualifier: input.query_value,
        time_point,
        display_name: input.display_name,
    };

    match state.scheduler.schedule(&cmd).await {
        Ok(specs) => {
            let ids: Vec<&str> = specs.iter().map(|s| s.id.as_str()).collect();
            (
                StatusCode::OK,
                Json(json!({ "message": "scheduler set successfully", "job_ids": ids })),
            )
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /v1 — cancel a reminder (both slots for appointments).
pub async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SchedulerInput>,
) -> (StatusCode, Json<Value>) {
    info!(
        user_id = %input.user_id,
        intent_name = %input.intent_name,
        query_value = %input.query_value,
        "received cancel request"
    );

    let cmd = CancelCommand {
        user_id: input.user_id,
        intent_name: input.intent_name,
        qualifier: input.query_value,
    };

    match state.scheduler.cancel(&cmd).await {
        Ok(CancelOutcome::Removed) => (
            StatusCode::OK,
            Json(json!({ "message": "scheduler deleted successfully" })),
        ),
        Ok(CancelOutcome::Pair(pair)) => {
            let status = if pair.any_removed() {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            (
                status,
                Json(json!({
                    "message": "appointment cancel processed",
                    "main_removed": pair.main_removed,
                    "reminder_removed": pair.reminder_removed,
                })),
            )
        }
        Err(e) => error_response(e),
    }
}

/// GET /v1 — look up what is scheduled. Appointment queries always return
/// two slots.
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> (StatusCode, Json<Value>) {
    let cmd = QueryCommand {
        user_id: params.user_id,
        intent_name: params.intent_name,
        qualifier: params.query_value,
    };

    match state.scheduler.query(&cmd) {
        Ok(outcome) => (StatusCode::OK, Json(json!({ "result": outcome }))),
        Err(e) => error_response(e),
    }
}

fn error_response(e: SchedulerError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        SchedulerError::InvalidTimestamp { .. } | SchedulerError::UnknownQualifier { .. } => {
            StatusCode::BAD_REQUEST
        }
        SchedulerError::AlreadyExists { .. } => StatusCode::CONFLICT,
        SchedulerError::JobNotFound { .. } => StatusCode::NOT_FOUND,
        // Half-applied pair: distinct from total failure so callers can
        // reconcile the slot that did get created.
        SchedulerError::AppointmentPartial { .. } => StatusCode::BAD_GATEWAY,
        SchedulerError::Database(_) | SchedulerError::CorruptRow { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(json!({ "error": e.to_string(), "code": e.code() })),
    )
}
