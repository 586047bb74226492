//! Service runner: loads the engine, binds the listener and serves until signalled.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::Engine;
use crate::models::ModelManager;
use crate::server::{self, AppState};

/// Run the service with the given configuration.
///
/// Models are loaded before the listener is bound, so a failed load
/// never leaves a half-started server behind.
pub async fn run(config: Config) -> Result<()> {
    let models_dir = config.model.models_dir()?;
    let models = ModelManager::with_dir(models_dir);
    let engine = Engine::load(&config.model, &models).await?;

    let state = Arc::new(AppState {
        engine,
        model: config.model.name.clone(),
        device: config.model.device.clone(),
        temp_dir: config.server.temp_dir.clone(),
    });
    let router = server::router(state, config.server.body_limit_bytes);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    server::serve(listener, router, shutdown).await?;

    info!("Service stopped");
    Ok(())
}

/// Wait for `SIGINT` or `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
