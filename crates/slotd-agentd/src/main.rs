use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use slotd_api::{HttpApi, SupervisorApiAdapter};
use slotd_core::Supervisor;
use slotd_observe::logger_init;
use slotd_prometheus::PrometheusMetrics;

mod cli;
mod metrics;
mod shutdown;

use cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1) Logger
    logger_init(&args.logger_config()?)?;
    info!(version = env!("CARGO_PKG_VERSION"), "slotd starting");

    // 2) Metrics + supervisor
    let metrics = PrometheusMetrics::new()?;
    let supervisor = Arc::new(Supervisor::with_metrics(
        args.supervisor_config(),
        Arc::new(metrics.clone()),
    )?);

    // 3) Shutdown trigger
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown::shutdown_signal().await;
            shutdown.cancel();
        }
    });

    // 4) Optional companion prestart, off the request path
    if args.prestart_companions {
        let supervisor = Arc::clone(&supervisor);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = supervisor.prestart_companions() => info!("companion prestart finished"),
                _ = shutdown.cancelled() => warn!("companion prestart interrupted by shutdown"),
            }
        });
    }

    // 5) HTTP surface
    let adapter = SupervisorApiAdapter::new(Arc::clone(&supervisor));
    let app = HttpApi::new(Arc::new(adapter))
        .router()
        .merge(metrics::router(metrics));

    let listener = TcpListener::bind(args.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;

    // 6) Tear down every slot whatever way the server ended
    info!("shutting down");
    shutdown.cancel();
    shutdown::cleanup(supervisor, args.shutdown_budget()).await;

    served?;
    Ok(())
}
