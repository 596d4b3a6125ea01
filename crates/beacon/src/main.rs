//! Beacon server entry point: config, logging, store, router, shutdown.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beacon_events::TelemetryStore;
use beacon_events::sqlite::{connection, migrations};
use beacon_server::auth::AuthConfig;
use beacon_server::{AppState, build_router, metrics};

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // RUST_LOG takes precedence over the configured level.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    // The schema must be in place before the listener binds.
    let pool = connection::open_pool(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path))?;
    {
        let conn = pool.get().context("failed to check out a connection")?;
        migrations::run(&conn).context("failed to run schema migrations")?;
    }
    let store = Arc::new(TelemetryStore::new(pool));

    let metrics_handle = metrics::install_recorder();

    let state = AppState::new(store, metrics_handle);
    #[cfg(feature = "apns")]
    let state = state.with_apns(build_apns(&config));
    let state = Arc::new(state);

    let app = build_router(state, AuthConfig::new(config.api_key.clone()));

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, db_path = %config.db_path, "beacon server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Build the APNS client when all four credentials are configured.
#[cfg(feature = "apns")]
fn build_apns(
    config: &ServerConfig,
) -> Option<Arc<beacon_server::platform::apns::ApnsService>> {
    use beacon_server::platform::apns::{ApnsConfig, ApnsService};

    let (Some(key_path), Some(key_id), Some(team_id), Some(bundle_id)) = (
        config.apns_key_path.clone(),
        config.apns_key_id.clone(),
        config.apns_team_id.clone(),
        config.apns_bundle_id.clone(),
    ) else {
        info!("APNS not configured, push delivery disabled");
        return None;
    };

    match ApnsService::new(ApnsConfig {
        key_path,
        key_id,
        team_id,
        bundle_id,
    }) {
        Ok(service) => Some(Arc::new(service)),
        Err(err) => {
            tracing::warn!(error = %err, "failed to initialize APNS, push delivery disabled");
            None
        }
    }
}

/// Resolve on ctrl-c or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                let _ = signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining in-flight requests");
}
