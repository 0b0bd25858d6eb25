//! Configuration system for the trial sweep.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `TRIAL_SWEEP_SERVER_HOST` / `TRIAL_SWEEP_SERVER_PORT` - Trigger endpoint bind address
//! - `TRIAL_SWEEP_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `TRIAL_SWEEP_DATABASE_URL` - Database connection URL (routed by scheme)
//! - `TRIAL_SWEEP_DATABASE_MAX_CONNECTIONS` - Pool size
//! - `TRIAL_SWEEP_DATABASE_QUERY_TIMEOUT` - Seconds allowed per account fetch or update
//! - `TRIAL_SWEEP_PAGE_SIZE` - Accounts fetched per page
//! - `TRIAL_SWEEP_CRON` - Schedule used by the in-process scheduler
//! - `RESEND_API_KEY` - Email provider credential
//! - `TRIAL_SWEEP_EMAIL_API_URL` - Email provider base URL
//! - `TRIAL_SWEEP_EMAIL_FROM` - Sender address
//! - `APP_URL` - Public application URL
//! - `ADMIN_WA_TEL` - WhatsApp number used for the renewal deep link
//! - `TRIAL_SWEEP_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{SweepError, SweepResult};
use crate::plans::PlanPricing;

/// Global configuration singleton.
static CONFIG: OnceLock<SweepConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// HTTP trigger configuration
    pub server: ServerConfig,
    /// Account datastore configuration
    pub database: DatabaseConfig,
    /// Sweep behaviour
    pub sweep: SweepSettings,
    /// Email provider configuration
    pub email: EmailConfig,
    /// Product details embedded in notifications
    pub app: AppConfig,
    /// Monthly price per plan
    pub plans: PlanPricing,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP trigger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing
    pub acquire_timeout_secs: u64,
    /// Seconds one account fetch or status update may take
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://trial_sweep.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/trial_sweep".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
            query_timeout_secs: 30,
        }
    }
}

/// Sweep behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Accounts fetched per page
    pub page_size: u32,
    /// Cron expression for the in-process scheduler (default: daily at 09:00)
    pub cron: String,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            page_size: 500,
            cron: "0 0 9 * * *".to_string(),
        }
    }
}

/// Email provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Bearer credential for the provider. Empty means every send fails.
    pub api_key: String,
    /// Provider base URL
    pub api_url: String,
    /// Sender, as `Name <address>`
    pub from: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.resend.com".to_string(),
            from: "PharmaGest <noreply@pharmagest.sn>".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Product details embedded in notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Product name used in subjects
    pub product_name: String,
    /// Public application URL
    pub url: String,
    /// WhatsApp number (digits only, international format) for renewals and support
    pub support_phone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            product_name: "PharmaGest".to_string(),
            url: "https://pharmagest.netlify.app".to_string(),
            support_phone: "221770000000".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> SweepError {
    SweepError::ConfigError(e.to_string())
}

impl SweepConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> SweepResult<Self> {
        let defaults = SweepConfig::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)
            .map_err(config_err)?
            .set_default("server.port", i64::from(defaults.server.port))
            .map_err(config_err)?
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )
            .map_err(config_err)?
            .set_default(
                "database.acquire_timeout_secs",
                defaults.database.acquire_timeout_secs as i64,
            )
            .map_err(config_err)?
            .set_default(
                "database.query_timeout_secs",
                defaults.database.query_timeout_secs as i64,
            )
            .map_err(config_err)?
            .set_default("sweep.page_size", i64::from(defaults.sweep.page_size))
            .map_err(config_err)?
            .set_default("sweep.cron", defaults.sweep.cron)
            .map_err(config_err)?
            .set_default("email.api_key", defaults.email.api_key)
            .map_err(config_err)?
            .set_default("email.api_url", defaults.email.api_url)
            .map_err(config_err)?
            .set_default("email.from", defaults.email.from)
            .map_err(config_err)?
            .set_default("email.timeout_secs", defaults.email.timeout_secs as i64)
            .map_err(config_err)?
            .set_default("app.product_name", defaults.app.product_name)
            .map_err(config_err)?
            .set_default("app.url", defaults.app.url)
            .map_err(config_err)?
            .set_default("app.support_phone", defaults.app.support_phone)
            .map_err(config_err)?
            .set_default("plans.starter", defaults.plans.starter as i64)
            .map_err(config_err)?
            .set_default("plans.professionnel", defaults.plans.professionnel as i64)
            .map_err(config_err)?
            .set_default("plans.entreprise", defaults.plans.entreprise as i64)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("TRIAL_SWEEP_SERVER_HOST").ok())
            .map_err(config_err)?
            .set_override_option(
                "server.port",
                env::var("TRIAL_SWEEP_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.db_type",
                env::var("TRIAL_SWEEP_DATABASE_TYPE").ok(),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("TRIAL_SWEEP_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("TRIAL_SWEEP_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.max_connections",
                env::var("TRIAL_SWEEP_DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.query_timeout_secs",
                env::var("TRIAL_SWEEP_DATABASE_QUERY_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "sweep.page_size",
                env::var("TRIAL_SWEEP_PAGE_SIZE")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("sweep.cron", env::var("TRIAL_SWEEP_CRON").ok())
            .map_err(config_err)?
            .set_override_option("email.api_key", env::var("RESEND_API_KEY").ok())
            .map_err(config_err)?
            .set_override_option("email.api_url", env::var("TRIAL_SWEEP_EMAIL_API_URL").ok())
            .map_err(config_err)?
            .set_override_option("email.from", env::var("TRIAL_SWEEP_EMAIL_FROM").ok())
            .map_err(config_err)?
            .set_override_option("app.url", env::var("APP_URL").ok())
            .map_err(config_err)?
            .set_override_option("app.support_phone", env::var("ADMIN_WA_TEL").ok())
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("TRIAL_SWEEP_LOG_LEVEL").ok())
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| SweepError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| SweepError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    ///
    /// A missing email API key is accepted: sends then fail and are counted
    /// as errors instead of preventing the sweep from running.
    pub fn validate(&self) -> SweepResult<()> {
        if self.server.port == 0 {
            return Err(SweepError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(SweepError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(SweepError::ConfigError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.acquire_timeout_secs == 0
            || self.database.query_timeout_secs == 0
            || self.email.timeout_secs == 0
        {
            return Err(SweepError::ConfigError(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.sweep.page_size == 0 {
            return Err(SweepError::ConfigError(
                "sweep.page_size must be greater than 0".to_string(),
            ));
        }

        let phone = &self.app.support_phone;
        if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(SweepError::ConfigError(format!(
                "app.support_phone must contain digits only, got '{phone}'"
            )));
        }

        url::Url::parse(&self.app.url)
            .map_err(|e| SweepError::ConfigError(format!("app.url is not a valid URL: {e}")))?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(SweepError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> SweepResult<&'static SweepConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = SweepConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| SweepError::ConfigError("configuration was not initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SweepConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sweep.page_size, 500);
        assert_eq!(config.sweep.cron, "0 0 9 * * *");
        assert_eq!(config.app.support_phone, "221770000000");
        assert!(config.email.api_key.is_empty());
        assert_eq!(config.database.query_timeout_secs, 30);
    }

    #[test]
    fn default_sqlite_url_creates_missing_file() {
        let config = SweepConfig::default();
        assert_eq!(config.database.sqlite_url, "sqlite://trial_sweep.db?mode=rwc");
    }

    #[test]
    fn rejects_zero_query_timeout() {
        let mut config = SweepConfig::default();
        config.database.query_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_database_type() {
        let mut config = SweepConfig::default();
        config.database.db_type = "mysql".to_string();
        assert!(matches!(
            config.validate(),
            Err(SweepError::ConfigError(msg)) if msg.contains("mysql")
        ));
    }

    #[test]
    fn rejects_zero_page_size() {
        let mut config = SweepConfig::default();
        config.sweep.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_numeric_support_phone() {
        let mut config = SweepConfig::default();
        config.app.support_phone = "+221 77 000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut config = SweepConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
