// src/server/mod.rs

//! Server-side components.
//!
//! This module contains:
//! - `database`  → SQL account store over SQLite/Postgres
//! - `handlers`  → Axum handlers for the sweep trigger and health probe
//! - `routes`    → Router builder
//!
//! [`build_sweep`] wires a configured [`TrialSweep`] from the global
//! configuration; both binaries start from it.

pub mod database;
pub mod handlers;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

pub use database::Database;
pub use handlers::{health_handler, trial_sweep_handler, AppState, HealthResponse};
pub use routes::build_router;

use crate::config::SweepConfig;
use crate::errors::{SweepError, SweepResult};
use crate::jobs::TrialSweep;
use crate::mailer::ResendMailer;
use crate::notification::NotificationSettings;

/// Connect to the configured database and build the sweep with a Resend
/// mailer.
pub async fn build_sweep(config: &SweepConfig) -> SweepResult<(Arc<Database>, TrialSweep)> {
    let db = Arc::new(Database::connect(&config.database).await?);

    if config.database.db_type == "sqlite" {
        db.ensure_schema().await?;
    }

    let mailer = ResendMailer::new(&config.email)
        .map_err(|e| SweepError::ConfigError(e.to_string()))?;

    let sweep = TrialSweep::new(
        db.clone(),
        Arc::new(mailer),
        NotificationSettings::from_config(config),
    )
    .with_page_size(config.sweep.page_size)
    .with_store_timeout(Duration::from_secs(config.database.query_timeout_secs));

    Ok((db, sweep))
}
