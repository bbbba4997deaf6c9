//! strawberry-hub - main entry point
//!
//! Startup order: logging, configuration, database (fatal on failure),
//! backend clients, reconciler, HTTP server. On Ctrl+C or SIGTERM the server
//! drains in-flight requests, then the reconciler is stopped.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use strawberry_common::config::{resolve_config_path, AppConfig, CONFIG_ENV};
use strawberry_hub::fanout::FanoutClient;
use strawberry_hub::reconciler::Reconciler;
use strawberry_hub::{build_router, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for strawberry-hub
#[derive(Parser, Debug)]
#[command(name = "strawberry-hub")]
#[command(about = "Group readiness orchestration service for Strawberry")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Listen address, overrides `bind_addr`
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database file, overrides `database_path`
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strawberry_hub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting strawberry-hub v{}", env!("CARGO_PKG_VERSION"));

    let config_path =
        resolve_config_path(args.config.as_deref()).context("Failed to locate config file")?;
    info!("Config: {}", config_path.display());

    let mut config = AppConfig::load(&config_path).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    info!("Database: {}", config.database_path.display());
    let db = strawberry_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let fanout = Arc::new(
        FanoutClient::from_config(&config).context("Failed to create backend clients")?,
    );
    for service in &config.services {
        info!("Backend {}: {}", service.name, service.base_url());
    }

    let cancel = CancellationToken::new();
    let reconciler = Reconciler::new(db.clone(), Arc::clone(&fanout), config.reconcile_interval())
        .spawn(cancel.clone());

    let state = AppState::new(db, fanout, config.client_secret.clone());
    let app = build_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    cancel.cancel();
    if let Err(e) = reconciler.await {
        error!("Reconciler task ended abnormally: {}", e);
    }

    served?;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
