//! OMS server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use oms_api::observability::{init_logging, parse_log_level, LoggingConfig};
use oms_api::{create_router, AppState};
use oms_server::OmsConfig;
use oms_storage::{MemoryDataStore, PostgresConfig, PostgresDataStore};

#[derive(Debug, Parser)]
#[command(name = "oms", about = "Order management server", version)]
struct Args {
    /// Path to a YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => OmsConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => OmsConfig::from_env().context("failed to load configuration from environment")?,
    };

    init_logging(&LoggingConfig {
        json_format: config.logging.json,
        default_level: parse_log_level(&config.logging.level),
    })
    .context("failed to initialize logging")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let app = match config.storage.backend.as_str() {
        "postgres" => {
            let database_url = config
                .storage
                .database_url
                .clone()
                .context("storage.database_url is required for the postgres backend")?;
            let storage = PostgresDataStore::from_config(&PostgresConfig {
                database_url,
                max_connections: config.storage.pool_size,
                connect_timeout_secs: config.storage.connection_timeout_secs,
                ..PostgresConfig::default()
            })
            .await
            .context("failed to connect to PostgreSQL")?;
            storage
                .run_migrations()
                .await
                .context("failed to run database migrations")?;
            info!("using PostgreSQL storage backend");
            create_router(AppState::new(Arc::new(storage)))
        }
        _ => {
            info!("using in-memory storage backend");
            create_router(AppState::new(Arc::new(MemoryDataStore::new())))
        }
    };

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "oms server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("oms server stopped");
    Ok(())
}

/// Resolves when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
