//! OS signal handling.

use tokio::sync::broadcast;

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on Ctrl+C, SIGTERM, or a [`Shutdown`](super::Shutdown) trigger.
pub async fn shutdown_signal(mut trigger: broadcast::Receiver<()>) {
    let source = tokio::select! {
        _ = ctrl_c() => "ctrl_c",
        _ = terminate() => "sigterm",
        _ = trigger.recv() => "trigger",
    };
    tracing::info!(source = source, "Shutdown signal received");
}
