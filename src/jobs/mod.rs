//! Background jobs.
//!
//! The trial sweep itself is always available in [`trial_sweep`]. With the
//! `background-jobs` feature, [`JobScheduler`] runs it on a cron schedule
//! inside the server process.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trial_sweep::jobs::{JobConfig, JobScheduler};
//!
//! let scheduler = JobScheduler::new(sweep, JobConfig::default()).await?;
//! scheduler.start().await?;
//! ```

pub mod trial_sweep;

pub use trial_sweep::{
    classify, days_remaining, Classification, SweepReport, SweepResponse, TrialSweep,
    DEFAULT_PAGE_SIZE, DEFAULT_STORE_TIMEOUT, REMINDER_DAYS,
};

#[cfg(feature = "background-jobs")]
pub use scheduler::{JobConfig, JobScheduler};

#[cfg(feature = "background-jobs")]
mod scheduler {
    use chrono::Utc;
    use std::sync::Arc;
    use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
    use tracing::{error, info};

    use super::{SweepReport, TrialSweep};
    use crate::config::SweepConfig;
    use crate::errors::{SweepError, SweepResult};

    /// Configuration for background jobs.
    #[derive(Debug, Clone)]
    pub struct JobConfig {
        /// Cron expression for the trial sweep (default: daily at 09:00)
        pub trial_sweep_cron: String,
    }

    impl Default for JobConfig {
        fn default() -> Self {
            Self {
                trial_sweep_cron: "0 0 9 * * *".to_string(),
            }
        }
    }

    impl JobConfig {
        pub fn from_config(config: &SweepConfig) -> Self {
            Self {
                trial_sweep_cron: config.sweep.cron.clone(),
            }
        }
    }

    /// Cron scheduler running the trial sweep.
    pub struct JobScheduler {
        scheduler: TokioJobScheduler,
        sweep: Arc<TrialSweep>,
        config: JobConfig,
    }

    impl JobScheduler {
        /// Create a new job scheduler.
        pub async fn new(sweep: Arc<TrialSweep>, config: JobConfig) -> SweepResult<Self> {
            let scheduler = TokioJobScheduler::new()
                .await
                .map_err(|e| SweepError::SchedulerError(e.to_string()))?;

            Ok(Self {
                scheduler,
                sweep,
                config,
            })
        }

        /// Register the sweep and start the scheduler.
        pub async fn start(&self) -> SweepResult<()> {
            info!("Starting job scheduler");

            self.add_trial_sweep_job().await?;

            self.scheduler
                .start()
                .await
                .map_err(|e| SweepError::SchedulerError(e.to_string()))?;

            info!("Job scheduler started successfully");

            Ok(())
        }

        /// Stop the job scheduler.
        pub async fn shutdown(&mut self) -> SweepResult<()> {
            info!("Shutting down job scheduler");
            self.scheduler
                .shutdown()
                .await
                .map_err(|e| SweepError::SchedulerError(e.to_string()))
        }

        async fn add_trial_sweep_job(&self) -> SweepResult<()> {
            let sweep = Arc::clone(&self.sweep);

            let job = Job::new_async(self.config.trial_sweep_cron.as_str(), move |_uuid, _l| {
                let sweep = Arc::clone(&sweep);
                Box::pin(async move {
                    match sweep.run(Utc::now()).await {
                        Ok(report) => {
                            info!(
                                "Scheduled trial sweep: {} sent, {} expired, {} errors",
                                report.sent, report.expired, report.errors
                            );
                        }
                        Err(e) => {
                            error!("Scheduled trial sweep failed: {}", e);
                        }
                    }
                })
            })
            .map_err(|e| SweepError::SchedulerError(e.to_string()))?;

            self.scheduler
                .add(job)
                .await
                .map_err(|e| SweepError::SchedulerError(e.to_string()))?;

            info!(
                "Added trial sweep job (schedule: {})",
                self.config.trial_sweep_cron
            );

            Ok(())
        }

        /// Run the sweep immediately (manual triggers, tests).
        pub async fn run_trial_sweep_now(&self) -> SweepResult<SweepReport> {
            self.sweep.run(Utc::now()).await
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::mailer::LogMailer;
        use crate::notification::NotificationSettings;
        use crate::store::MemoryStore;

        #[test]
        fn default_config_runs_daily_at_nine() {
            let config = JobConfig::default();
            assert_eq!(config.trial_sweep_cron, "0 0 9 * * *");
            assert_eq!(
                JobConfig::from_config(&SweepConfig::default()).trial_sweep_cron,
                config.trial_sweep_cron
            );
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn run_now_sweeps_and_shutdown_stops_the_scheduler() {
            let sweep = TrialSweep::new(
                Arc::new(MemoryStore::new()),
                Arc::new(LogMailer),
                NotificationSettings::default(),
            );
            let mut scheduler = JobScheduler::new(Arc::new(sweep), JobConfig::default())
                .await
                .unwrap();
            scheduler.start().await.unwrap();

            let report = scheduler.run_trial_sweep_now().await.unwrap();
            assert_eq!((report.sent, report.expired, report.errors), (0, 0, 0));

            scheduler.shutdown().await.unwrap();
        }
    }
}
