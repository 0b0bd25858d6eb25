use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::SweepError;
use crate::jobs::{SweepResponse, TrialSweep};

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub sweep: Arc<TrialSweep>,
    /// Reported by the health endpoint
    pub db_type: String,
}

/// Error body: `{ "error": "<message>" }`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    pub error: String,
}

/// Map SweepError into a 500 response.
///
/// Only a failed account fetch reaches a handler in practice; every other
/// failure is absorbed into the sweep report.
impl IntoResponse for SweepError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Run one trial sweep now.
///
/// Takes no request body. Returns `{ ok, sent, expired, errors, ts }`, or
/// 500 with `{ error }` if accounts could not be fetched.
pub async fn trial_sweep_handler(
    State(state): State<AppState>,
) -> Result<Json<SweepResponse>, SweepError> {
    info!("Trial sweep triggered over HTTP");

    let report = state.sweep.run(Utc::now()).await?;

    Ok(Json(SweepResponse::from(report)))
}

/// Health check response structure.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Database type (sqlite or postgres)
    pub db_type: String,
}

impl HealthResponse {
    pub fn ok(db_type: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            db_type: db_type.to_string(),
        }
    }
}

/// Liveness probe.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(&state.db_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_reports_package() {
        let health = HealthResponse::ok("sqlite");
        assert_eq!(health.status, "ok");
        assert_eq!(health.service, "trial-sweep");
        assert_eq!(health.db_type, "sqlite");
    }

    #[test]
    fn sweep_errors_map_to_500() {
        let response = SweepError::StoreError("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = SweepError::ConfigError("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
