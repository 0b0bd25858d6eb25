//! Trial sweep - reminds and expires trial accounts on a schedule.
//!
//! Each run reads the accounts still in `trial`, sends a renewal reminder
//! 7, 3 and 1 days before the trial ends, and moves accounts whose trial is
//! over to `expired` with an expiration notice.
//!
//! # Features
//!
//! - `server` - SQL account store, HTTP trigger and binaries. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `background-jobs` - In-process cron scheduler for the sweep.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chrono::Utc;
//! use trial_sweep::jobs::TrialSweep;
//! use trial_sweep::mailer::LogMailer;
//! use trial_sweep::notification::NotificationSettings;
//! use trial_sweep::store::MemoryStore;
//!
//! let sweep = TrialSweep::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(LogMailer),
//!     NotificationSettings::default(),
//! );
//! let report = sweep.run(Utc::now()).await?;
//! println!("{} reminders sent", report.sent);
//! ```

// Core modules (always available)
pub mod account;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod mailer;
pub mod notification;
pub mod plans;
pub mod store;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
