//! OS shutdown signals

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Resolve on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl-C, ending conversation after the current turn");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, ending conversation after the current turn");
        }
    }
}

/// Raise `shutdown` when the process is asked to stop
pub fn spawn_shutdown_listener(shutdown: Arc<watch::Sender<bool>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.send_replace(true);
    })
}
