//! Codibot - Main entry point
//!
//! Crowdsourced transit ticketing-code service: bootstraps the database,
//! loads the crowd configuration, and serves the event API until
//! shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codibot_bot::api;
use codibot_bot::dispatch::Dispatcher;
use codibot_common::config::CrowdConfig;
use codibot_common::db::init_database;

/// Command-line arguments for codibot-bot
#[derive(Parser, Debug)]
#[command(name = "codibot-bot")]
#[command(about = "Crowdsourced transit ticketing-code service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "CODIBOT_PORT")]
    port: u16,

    /// Path to the SQLite database file
    #[arg(short, long, default_value = "codibot.db", env = "CODIBOT_DB")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codibot_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting codibot on port {}", args.port);
    info!("Database: {}", args.database.display());

    let db = init_database(&args.database)
        .await
        .context("Failed to initialize database")?;

    let config = CrowdConfig::load(&db)
        .await
        .context("Failed to load crowd configuration")?;

    let session_idle_timeout = Duration::from_millis(config.session_idle_timeout_ms);
    let dispatcher = Arc::new(Dispatcher::new(db, config));

    // Background eviction keeps the session map bounded
    let sessions = dispatcher.sessions();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            sessions.evict_idle(session_idle_timeout).await;
        }
    });

    let app = api::create_router(api::AppState { dispatcher });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
