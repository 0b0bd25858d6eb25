//! One-shot trial sweep, for external schedulers (cron, systemd timers).
//!
//! Prints the JSON report on stdout. On failure prints `{ "error": ... }`
//! and exits non-zero.

use chrono::Utc;
use serde_json::json;
use std::process::ExitCode;

use trial_sweep::config::get_config;
use trial_sweep::errors::SweepResult;
use trial_sweep::jobs::SweepResponse;
use trial_sweep::logging::init_logging;
use trial_sweep::server::build_sweep;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(body) => {
                println!("{body}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{}", json!({ "error": e.to_string() }));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            println!("{}", json!({ "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SweepResult<SweepResponse> {
    let config = get_config()?;
    init_logging(&config.logging);

    let (_db, sweep) = build_sweep(config).await?;
    let report = sweep.run(Utc::now()).await?;

    Ok(SweepResponse::from(report))
}
