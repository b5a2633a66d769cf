//! KVDB Web server entry point.
//!
//! Loads configuration, initializes structured logging, builds the backend
//! client over the configured trust store, then starts the Axum HTTP server
//! with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kvdbw_client::{Credential, KvdbClient, TrustStore};
use kvdbw_server::config::{AppConfig, LoggingConfig};
use kvdbw_server::routes;
use kvdbw_server::state::AppState;

/// KVDB Web: browse and edit a KVDB key/value store from the browser.
#[derive(Debug, Parser)]
#[command(name = "kvdbw", version, about)]
struct Args {
    /// Configuration file name, looked up in /app and the working directory.
    #[arg(long, env = "KVDBW_CONFIG", default_value = "config")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config).context("failed to load configuration")?;
    init_logging(&config.logging);

    match &config.source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => warn!(name = %args.config, "no configuration file found, using defaults"),
    }

    let backend = config.backend_config();
    let trust = TrustStore::load_dir(&backend.cert_dir);
    info!(
        dir = %backend.cert_dir.display(),
        certificates = trust.len(),
        files = trust.loaded_files(),
        skipped = trust.skipped_files(),
        "trust store loaded"
    );
    let client = KvdbClient::with_trust_store(&backend, Credential::from_env(), &trust)
        .context("failed to build backend client")?;
    info!(backend = client.base_url(), user = %backend.username, "KVDB Web starting");

    if let Err(e) = client.get_health().await {
        warn!(error = %e, "backend not healthy at startup");
    }

    let state = Arc::new(AppState::new(client, config.debug));
    let app = routes::app(state, &config.prometheus);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, metrics = config.prometheus.enabled, "KVDB Web listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("KVDB Web stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
