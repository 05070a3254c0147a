//! Server lifecycle: open the store, bind, serve until signalled

use crate::config::ServerConfig;
use crate::router::build_router;
use crate::state::AppState;
use anyhow::Context;
use dmp_store::CatalogStore;
use tokio::net::TcpListener;

/// Run the HTTP server until SIGTERM or Ctrl-C
///
/// # Errors
/// Store open, bind, or server I/O failure
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store_config = config.store.clone();
    let store = tokio::task::spawn_blocking(move || CatalogStore::open(&store_config))
        .await
        .context("store open task failed")?
        .context("failed to open catalog store")?;
    tracing::info!(
        backend = store.backend_kind(),
        environment = ?config.environment,
        "catalog store ready"
    );

    let state = AppState::new(store, config.auth.clone());
    let app = build_router(state, &config);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "dmp-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("gracefully shutting down");
}
