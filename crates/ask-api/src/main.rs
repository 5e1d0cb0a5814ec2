//! Ask API Server
//!
//! HTTP gateway in front of the retrieval-augmented generation engine.
//!
//! Author: hephaex@gmail.com

use ask_api::{create_router, state::AppState};
use ask_core::{config::LoggingConfig, AppConfig};
use ask_engine::create_engine;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: optional TOML file, environment on top
    let config = match std::env::var("ASK_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);
    config.validate()?;

    // Create answer engine and application state
    let handle = create_engine(&config)?;
    tracing::info!(
        engine = handle.engine.name(),
        url = %config.engine.base_url,
        "Answer engine configured"
    );
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, handle));

    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Ask API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("Ask API Server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        EnvFilter::new(format!(
            "ask_api={level},ask_engine={level},tower_http={level}"
        ))
    });

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Resolves on Ctrl+C or SIGTERM, after marking the service not ready
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.set_ready(false);
    tracing::info!("Shutdown signal received, draining connections");
}
