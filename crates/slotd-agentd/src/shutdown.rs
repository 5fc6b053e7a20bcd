use std::{sync::Arc, time::Duration};

use slotd_core::Supervisor;
use tokio::signal;
use tracing::{error, info, warn};

/// Resolves on Ctrl+C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Tear every slot down within `budget`. Never fails.
pub(crate) async fn cleanup(supervisor: Arc<Supervisor>, budget: Duration) {
    let task = tokio::spawn(async move { supervisor.cleanup_all().await });
    match tokio::time::timeout(budget, task).await {
        Ok(Ok(())) => info!("slot cleanup finished"),
        Ok(Err(e)) => warn!(error = %e, "slot cleanup task failed"),
        Err(_) => warn!(
            budget_ms = budget.as_millis() as u64,
            "slot cleanup did not finish in time"
        ),
    }
}
