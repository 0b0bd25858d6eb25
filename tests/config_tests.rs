use std::env;

use serial_test::serial;
use trial_sweep::config::SweepConfig;
use trial_sweep::notification::NotificationSettings;

const VARS: [&str; 6] = [
    "RESEND_API_KEY",
    "APP_URL",
    "ADMIN_WA_TEL",
    "TRIAL_SWEEP_DATABASE_URL",
    "TRIAL_SWEEP_PAGE_SIZE",
    "TRIAL_SWEEP_LOG_LEVEL",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn loads_defaults_without_environment() {
    clear_env();

    let config = SweepConfig::load().expect("config should load");
    config.validate().expect("defaults should validate");

    assert_eq!(config.app.support_phone, "221770000000");
    assert_eq!(config.app.url, "https://pharmagest.netlify.app");
    assert_eq!(config.plans.entreprise, 55_000);
    assert!(config.email.api_key.is_empty());
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    env::set_var("RESEND_API_KEY", "re_test_123");
    env::set_var("APP_URL", "https://app.example.sn");
    env::set_var("ADMIN_WA_TEL", "221781234567");
    env::set_var("TRIAL_SWEEP_PAGE_SIZE", "50");

    let config = SweepConfig::load().expect("config should load");
    clear_env();

    assert_eq!(config.email.api_key, "re_test_123");
    assert_eq!(config.app.url, "https://app.example.sn");
    assert_eq!(config.sweep.page_size, 50);

    let settings = NotificationSettings::from_config(&config);
    assert_eq!(settings.support_phone, "221781234567");
}

#[test]
#[serial]
fn database_url_is_routed_by_scheme() {
    clear_env();
    env::set_var("TRIAL_SWEEP_DATABASE_URL", "postgres://db.internal/accounts");

    let config = SweepConfig::load().expect("config should load");
    clear_env();

    assert_eq!(config.database.postgres_url, "postgres://db.internal/accounts");
    assert_eq!(config.database.sqlite_url, "sqlite://trial_sweep.db?mode=rwc");
}

#[test]
#[serial]
fn invalid_log_level_fails_validation() {
    clear_env();
    env::set_var("TRIAL_SWEEP_LOG_LEVEL", "loud");

    let config = SweepConfig::load().expect("config should load");
    clear_env();

    assert!(config.validate().is_err());
}
