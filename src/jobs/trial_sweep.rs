//! Trial sweep job.
//!
//! One run reads every account still in `trial`, works out how many days
//! remain before its trial ends and then:
//!
//! - `days < 0`: sets `status = 'expired'` and sends the expiration notice
//! - `days` in 7, 3, 1: sends a trial reminder
//! - anything else: leaves the account alone
//!
//! Runs keep no state between invocations. Running twice on the same day
//! sends the same reminders twice.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};

use crate::account::Account;
use crate::errors::{SweepError, SweepResult};
use crate::logging::{generate_run_id, log_account_event, AccountEvent};
use crate::mailer::{MailError, Mailer};
use crate::notification::{build_notification, NotificationKind, NotificationSettings};
use crate::store::AccountStore;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Days-remaining values that trigger a reminder.
pub const REMINDER_DAYS: [i64; 3] = [7, 3, 1];

/// Default number of accounts fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Default limit on one account fetch or status update.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole days until `trial_end`, rounded up.
///
/// A trial ending in 30 minutes has 1 day left. A trial that ended less
/// than a day ago has 0 days left, not -1.
pub fn days_remaining(trial_end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (trial_end - now).num_milliseconds();
    let days = ms.div_euclid(DAY_MS);
    if ms.rem_euclid(DAY_MS) == 0 {
        days
    } else {
        days + 1
    }
}

/// Action the sweep takes for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Expire,
    Remind { days: i64 },
    NoOp,
}

/// Map days remaining to an action. First match wins.
pub fn classify(days_remaining: i64) -> Classification {
    if days_remaining < 0 {
        Classification::Expire
    } else if REMINDER_DAYS.contains(&days_remaining) {
        Classification::Remind {
            days: days_remaining,
        }
    } else {
        Classification::NoOp
    }
}

fn serialize_ts<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Reminders accepted by the email provider
    pub sent: u32,
    /// Accounts moved to `expired`, whatever happened to their notice
    pub expired: u32,
    /// Reminders that could not be delivered
    pub errors: u32,
    /// The instant every account was compared against
    #[serde(serialize_with = "serialize_ts")]
    pub ts: DateTime<Utc>,
}

impl SweepReport {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self {
            sent: 0,
            expired: 0,
            errors: 0,
            ts,
        }
    }
}

/// Success body returned to whoever triggered the run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: SweepReport,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self { ok: true, report }
    }
}

/// The sweep, wired to a store and a mailer.
pub struct TrialSweep {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    settings: NotificationSettings,
    page_size: u32,
    store_timeout: Duration,
}

impl TrialSweep {
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            store,
            mailer,
            settings,
            page_size: DEFAULT_PAGE_SIZE,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Set how many accounts are fetched per page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Bound every account fetch and status update. A call that runs past
    /// the limit fails with a `StoreError`.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        op: &str,
        call: impl Future<Output = SweepResult<T>>,
    ) -> SweepResult<T> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(SweepError::StoreError(format!(
                    "{op} timed out after {}s",
                    self.store_timeout.as_secs_f64()
                )))
            })
    }

    /// Run one sweep, comparing every account against `now`.
    ///
    /// Fails only if fetching a page of accounts fails or times out. Pages
    /// already processed keep their effects. Delivery failures are counted
    /// in the report; a failed or timed-out status update is logged and the
    /// account is left for the next run.
    pub async fn run(&self, now: DateTime<Utc>) -> SweepResult<SweepReport> {
        let span = info_span!("trial_sweep", run_id = %generate_run_id());
        self.run_inner(now).instrument(span).await
    }

    async fn run_inner(&self, now: DateTime<Utc>) -> SweepResult<SweepReport> {
        info!("Starting trial sweep at {}", now);

        let mut report = SweepReport::new(now);
        let mut after_id: Option<String> = None;

        loop {
            let page = self
                .bounded(
                    "fetch_trial_accounts",
                    self.store
                        .fetch_trial_accounts(after_id.as_deref(), self.page_size),
                )
                .await
                .map_err(|e| {
                    error!("Trial sweep aborted, failed to fetch accounts: {}", e);
                    e
                })?;

            debug!("Fetched {} trial accounts", page.len());

            for account in &page {
                self.process(account, now, &mut report).await;
            }

            match page.last() {
                Some(last) if page.len() >= self.page_size as usize => {
                    after_id = Some(last.id.clone());
                }
                _ => break,
            }
        }

        info!(
            sent = report.sent,
            expired = report.expired,
            errors = report.errors,
            "Trial sweep finished"
        );

        Ok(report)
    }

    async fn process(&self, account: &Account, now: DateTime<Utc>, report: &mut SweepReport) {
        let days = days_remaining(account.trial_end, now);

        match classify(days) {
            Classification::Expire => self.expire(account, report).await,
            Classification::Remind { days } => self.remind(account, days, report).await,
            Classification::NoOp => {
                debug!("Account {} has {} days left, nothing to do", account.id, days);
            }
        }
    }

    async fn expire(&self, account: &Account, report: &mut SweepReport) {
        match self
            .bounded("mark_expired", self.store.mark_expired(&account.id))
            .await
        {
            Ok(true) => {
                report.expired += 1;
                log_account_event(AccountEvent::Expired, &account.id, None);

                if let Err(e) = self.notify(account, NotificationKind::Expired).await {
                    log_account_event(
                        AccountEvent::ExpiryNoticeFailed,
                        &account.id,
                        Some(&e.to_string()),
                    );
                }
            }
            Ok(false) => {
                debug!("Account {} is no longer in trial, skipping", account.id);
            }
            Err(e) => {
                log_account_event(AccountEvent::ExpireFailed, &account.id, Some(&e.to_string()));
            }
        }
    }

    async fn remind(&self, account: &Account, days: i64, report: &mut SweepReport) {
        match self
            .notify(account, NotificationKind::TrialReminder { days })
            .await
        {
            Ok(()) => {
                report.sent += 1;
                log_account_event(
                    AccountEvent::ReminderSent,
                    &account.id,
                    Some(&format!("{days} days left")),
                );
            }
            Err(e) => {
                report.errors += 1;
                log_account_event(AccountEvent::ReminderFailed, &account.id, Some(&e.to_string()));
            }
        }
    }

    async fn notify(&self, account: &Account, kind: NotificationKind) -> Result<(), MailError> {
        debug!("Sending {} notice to account {}", kind.as_str(), account.id);
        let email = build_notification(account, kind, &self.settings).into_email(&self.settings.from);
        self.mailer.send(&email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn days_round_up() {
        let now = now();
        assert_eq!(days_remaining(now + Duration::minutes(30), now), 1);
        assert_eq!(days_remaining(now + Duration::days(1), now), 1);
        assert_eq!(days_remaining(now + Duration::days(1) + Duration::seconds(1), now), 2);
        assert_eq!(
            days_remaining(now + Duration::days(3) + Duration::hours(2), now),
            4
        );
        assert_eq!(days_remaining(now, now), 0);
    }

    #[test]
    fn recently_ended_trial_has_zero_days() {
        let now = now();
        assert_eq!(days_remaining(now - Duration::hours(2), now), 0);
        assert_eq!(days_remaining(now - Duration::hours(23), now), 0);
        assert_eq!(days_remaining(now - Duration::days(1), now), -1);
        assert_eq!(days_remaining(now - Duration::hours(25), now), -1);
    }

    #[test]
    fn classification_policy() {
        assert_eq!(classify(-1), Classification::Expire);
        assert_eq!(classify(-40), Classification::Expire);
        assert_eq!(classify(7), Classification::Remind { days: 7 });
        assert_eq!(classify(3), Classification::Remind { days: 3 });
        assert_eq!(classify(1), Classification::Remind { days: 1 });
        for days in [0, 2, 4, 5, 6, 8, 14, 30] {
            assert_eq!(classify(days), Classification::NoOp, "days = {days}");
        }
    }

    #[test]
    fn response_serializes_with_ok_flag() {
        let report = SweepReport {
            sent: 2,
            expired: 1,
            errors: 0,
            ts: now(),
        };
        let json = serde_json::to_value(SweepResponse::from(report)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["sent"], 2);
        assert_eq!(json["expired"], 1);
        assert_eq!(json["errors"], 0);
        assert_eq!(json["ts"], "2026-03-10T09:00:00.000Z");
    }
}
