//! Structured logging for sweep runs.
//!
//! Every account the sweep acts on produces one [`AccountEvent`], logged in
//! an `account_event` span carrying the account id. Runs are identified by a
//! generated run id so interleaved runs can be told apart.

use std::str::FromStr;
use tracing::{error, info, info_span, warn, Level};
use uuid::Uuid;

use crate::config::LoggingConfig;

/// Outcome of the sweep for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEvent {
    /// Account was moved to `expired`
    Expired,
    /// Expiration notice could not be delivered (account stays expired)
    ExpiryNoticeFailed,
    /// Status update to `expired` failed; retried next run
    ExpireFailed,
    /// Trial reminder delivered
    ReminderSent,
    /// Trial reminder could not be delivered
    ReminderFailed,
}

impl std::fmt::Display for AccountEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountEvent::Expired => "expired",
            AccountEvent::ExpiryNoticeFailed => "expiry_notice_failed",
            AccountEvent::ExpireFailed => "expire_failed",
            AccountEvent::ReminderSent => "reminder_sent",
            AccountEvent::ReminderFailed => "reminder_failed",
        };
        write!(f, "{}", s)
    }
}

/// Log an account event.
///
/// # Arguments
///
/// * `event` - What happened to the account
/// * `account_id` - The account id
/// * `details` - Optional additional details (error message, day count)
pub fn log_account_event(event: AccountEvent, account_id: &str, details: Option<&str>) {
    let span = info_span!(
        "account_event",
        event = %event,
        account_id = %account_id,
    );
    let _enter = span.enter();

    match event {
        AccountEvent::ExpireFailed => {
            error!(reason = details.unwrap_or("unknown"), "Account event occurred");
        }
        AccountEvent::ReminderFailed | AccountEvent::ExpiryNoticeFailed => {
            warn!(reason = details.unwrap_or("unknown"), "Account event occurred");
        }
        AccountEvent::Expired | AccountEvent::ReminderSent => {
            if let Some(d) = details {
                info!(details = %d, "Account event occurred");
            } else {
                info!("Account event occurred");
            }
        }
    }
}

/// Generate a new unique sweep run id.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Install the global `fmt` subscriber at the configured level.
///
/// Logs go to stderr so stdout stays free for the one-shot report.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let level = Level::from_str(&config.level).unwrap_or(Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_valid_uuid() {
        let id = generate_run_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(AccountEvent::ReminderSent.to_string(), "reminder_sent");
        assert_eq!(AccountEvent::ExpireFailed.to_string(), "expire_failed");
    }

    #[test]
    fn init_logging_twice_does_not_panic() {
        let config = LoggingConfig {
            level: "debug".to_string(),
        };
        init_logging(&config);
        init_logging(&config);
        log_account_event(AccountEvent::Expired, "ph-1", None);
    }
}
