use axum::{
    routing::{get, post},
    Router,
};
use herald_core::config::HeraldConfig;
use herald_scheduler::ReminderManager;
use herald_tracker::TrackerManager;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: HeraldConfig,
    pub scheduler: ReminderManager,
    pub tracker: TrackerManager,
}

impl AppState {
    pub fn new(config: HeraldConfig, scheduler: ReminderManager, tracker: TrackerManager) -> Self {
        Self {
            config,
            scheduler,
            tracker,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/v1",
            post(crate::http::scheduler::schedule_handler)
                .delete(crate::http::scheduler::cancel_handler)
                .get(crate::http::scheduler::query_handler),
        )
        .route("/tracking", post(crate::http::tracking::record_handler))
        .route(
            "/tracking/{user_id}",
            get(crate::http::tracking::get_handler)
                .delete(crate::http::tracking::delete_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
