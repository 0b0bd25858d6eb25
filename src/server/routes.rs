use axum::{
    routing::{get, post},
    Router,
};

use crate::server::handlers::{health_handler, trial_sweep_handler, AppState};

/// Build the application router.
///
/// # Routes
///
/// - `POST /relance-trial` - Run one trial sweep (also `GET`, for cron
///   services that can only issue GET requests)
/// - `GET /health` - Liveness probe
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/relance-trial",
            post(trial_sweep_handler).get(trial_sweep_handler),
        )
        .route("/health", get(health_handler))
        .with_state(state)
}
