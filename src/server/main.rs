use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use trial_sweep::config::get_config;
use trial_sweep::errors::{SweepError, SweepResult};
use trial_sweep::logging::init_logging;
use trial_sweep::server::{build_router, build_sweep, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server stopped: {}", e);
            eprintln!("trial_sweep_server: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SweepResult<()> {
    let config = get_config()?;
    init_logging(&config.logging);

    let (_db, sweep) = build_sweep(config).await?;
    let sweep = Arc::new(sweep);

    #[cfg(feature = "background-jobs")]
    let mut scheduler = {
        use trial_sweep::jobs::{JobConfig, JobScheduler};

        let scheduler =
            JobScheduler::new(Arc::clone(&sweep), JobConfig::from_config(config)).await?;
        scheduler.start().await?;
        scheduler
    };

    let state = AppState {
        sweep,
        db_type: config.database.db_type.clone(),
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| SweepError::ConfigError(format!("invalid server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SweepError::ConfigError(format!("failed to bind {addr}: {e}")))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SweepError::ConfigError(format!("server error: {e}")))?;

    #[cfg(feature = "background-jobs")]
    scheduler.shutdown().await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
