#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::sync::Arc;

use args::Args;
use clap::Parser;
use glados_config::Config;
use glados_engine::{Engine, EngineSettings, default_loader};
use glados_server::Server;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration, then apply command line overrides
    let mut config = Config::load_or_default(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    let log_filter = glados_telemetry::log_filter(args.log_level.as_deref(), config.telemetry.as_ref()).to_string();
    let _telemetry_guard = glados_telemetry::init(config.telemetry.as_ref(), &log_filter)?;

    tracing::info!(
        config_path = %args.config.display(),
        "starting glados"
    );

    // Model loading blocks
    let settings = EngineSettings::from_config(&config.engine)?;
    let model_dir = config.engine.model_dir.clone();
    let engine = Engine::global();
    let starting = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || starting.start(settings, default_loader(&model_dir).as_ref())).await??;

    let server = Server::new(&config, engine);

    // Set up graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    server.serve(shutdown).await?;

    tracing::info!("glados stopped");
    Ok(())
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
