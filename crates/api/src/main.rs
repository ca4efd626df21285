use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jojo_api::config::ServerConfig;
use jojo_api::router::build_app_router;
use jojo_api::state::AppState;
use jojo_core::scripting::RegistryHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jojo_api=debug,jojo_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(
        script_dir = %config.script_dir.display(),
        host = %config.host,
        port = config.port,
        "Loaded server configuration"
    );

    // --- Script registry ---
    let registry = RegistryHandle::load(config.script_dir.clone())
        .await
        .with_context(|| format!("Failed to load scripts from {}", config.script_dir.display()))?;
    tracing::info!(scripts = registry.current().await.len(), "Script registry loaded");

    // --- Router ---
    let unix_socket = config.unix_socket.clone();
    let host = config.host.clone();
    let port = config.port;
    let app = build_app_router(AppState::new(config.clone(), registry), &config);

    tracing::warn!("Serving plain HTTP; put a TLS-terminating proxy in front for remote access");

    // --- Start server ---
    match unix_socket {
        Some(path) => {
            remove_stale_socket(&path)?;
            let listener = tokio::net::UnixListener::bind(&path)
                .with_context(|| format!("Failed to bind unix socket {}", path.display()))?;
            tracing::info!(socket = %path.display(), "Starting server");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            remove_stale_socket(&path)?;
        }
        None => {
            let ip: IpAddr = host
                .parse()
                .with_context(|| format!("Invalid HOST address '{host}'"))?;
            let addr = SocketAddr::new(ip, port);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind to {addr}"))?;
            tracing::info!(%addr, "Starting server");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Remove a socket file left behind by a previous run.
fn remove_stale_socket(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to remove socket {}", path.display()))
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM so the server shuts down
/// cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

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

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
