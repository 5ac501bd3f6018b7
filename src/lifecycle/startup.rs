//! Startup orchestration.
//!
//! Config is loaded and validated first, then logging and metrics, then the
//! server is assembled; the listener binds last so traffic only arrives once
//! everything is ready. Any startup error is fatal.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};

use crate::config::{load_config, validate_config, ConfigError, ProxyConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

/// Load the config file if given, otherwise start from defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ProxyConfig::default()),
    }
}

/// Re-run validation after command-line overrides were applied.
pub fn revalidate(config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Start every subsystem and serve until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-proxy starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse().map_err(|_| {
            ConfigError::Validation(vec![crate::config::ValidationError::Address {
                field: "observability.metrics_address",
                value: config.observability.metrics_address.clone(),
            }])
        })?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config.clone())?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    supervise(server_task, signals::forward_signals(&shutdown)).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for the server to stop, either on its own or after `stop` resolves.
///
/// A server that exits before any signal arrives surfaces its error right
/// away instead of waiting for SIGINT/SIGTERM.
async fn supervise<F>(
    mut server_task: JoinHandle<std::io::Result<()>>,
    stop: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        result = &mut server_task => {
            tracing::error!("Server exited before a shutdown signal");
            result??;
            return Ok(());
        }
        _ = stop => {}
    }

    server_task.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_early_server_failure_is_reported_without_signal() {
        let task = tokio::spawn(async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::AddrInUse, "listener died"))
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            supervise(task, std::future::pending()),
        )
        .await
        .expect("supervise kept waiting for a signal");

        assert!(matches!(result, Err(StartupError::Io(e)) if e.kind() == std::io::ErrorKind::AddrInUse));
    }

    #[tokio::test]
    async fn test_signal_drains_server() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let task = tokio::spawn(async move {
            crate::lifecycle::shutdown::wait(rx).await;
            Ok(())
        });

        let result = supervise(task, async { shutdown.trigger() }).await;
        assert!(result.is_ok());
    }
}
