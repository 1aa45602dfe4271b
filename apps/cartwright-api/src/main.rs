//! # Cartwright API Server
//!
//! ```bash
//! cargo run -p cartwright-db --bin seed      # sample catalog
//! cargo run -p cartwright-api                # serve on 127.0.0.1:5000
//! ```
//!
//! Configuration comes from `CARTWRIGHT_*` environment variables
//! (see [`cartwright_api::config`]); logging from `RUST_LOG`.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartwright_api::config::ApiConfig;
use cartwright_api::services::sweeper;
use cartwright_api::state::AppState;
use cartwright_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartwright_api=info,cartwright_db=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cartwright API server...");

    let config = ApiConfig::load()?;
    info!(
        addr = %config.bind_addr(),
        database = %config.database_path,
        cart_store = ?config.cart_store,
        "Configuration loaded"
    );

    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("opening database")?;

    let state = AppState::new(config.clone(), db.clone())
        .await
        .context("opening session store")?;

    let sweep_task = sweeper::spawn(
        state.cart_handle(),
        state.sessions().clone(),
        config.cart_ttl(),
        config.sweep_interval(),
    );

    let app = cartwright_api::router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("cartwright-api listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweep_task.abort();
    db.close().await;
    info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
