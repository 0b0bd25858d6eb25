//! Error types shared across the sweep, its stores and its trigger surfaces.

use thiserror::Error;

/// Errors that abort a sweep or prevent it from starting.
///
/// Per-account notification failures are not represented here: they are
/// absorbed into the sweep report counters (see [`crate::mailer::MailError`]).
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("account store error: {0}")]
    StoreError(String),

    #[error("scheduler error: {0}")]
    SchedulerError(String),
}

/// Convenience alias used throughout the crate.
pub type SweepResult<T> = Result<T, SweepError>;
