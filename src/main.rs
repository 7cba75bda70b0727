use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info, warn};

use usdt_rates::config::{Cli, Config};
use usdt_rates::exchange::{self, grinex::Grinex};
use usdt_rates::metrics::{self, Metrics};
use usdt_rates::repository::{self, PgRateRepository};
use usdt_rates::server::RateHandler;
use usdt_rates::service::{RateService, RatesProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load(Cli::parse())?;
    info!(
        api_url = %config.api_url,
        grpc_port = config.port,
        metrics_port = config.metrics_port,
        "starting usdt rates service"
    );

    let pool = repository::connect(&config.db_url, config.max_connections).await?;
    info!(max_connections = config.max_connections, "database connection established");
    repository::migrate(&pool).await?;
    info!("database migrations completed");

    // Bind both listeners up front: fail fast if a port is taken.
    let grpc_listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let grpc_addr = grpc_listener.local_addr()?;
    let metrics_listener = TcpListener::bind(("0.0.0.0", config.metrics_port)).await?;

    let cancel = CancellationToken::new();
    let metrics = Arc::new(Metrics::default());

    let source = Grinex::new(exchange::http_client()?, config.api_url);
    let sink = PgRateRepository::new(pool.clone());
    let provider: Arc<dyn RatesProvider> = Arc::new(RateService::new(source, sink));
    let handler = RateHandler::new(provider, metrics.clone());

    let http_handle = tokio::spawn(metrics::serve_http(metrics_listener, metrics, cancel.clone()));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("received shutdown signal, draining");
            cancel.cancel();
        }
    });

    info!(%grpc_addr, "gRPC server listening");
    let incoming = tokio_stream::wrappers::TcpListenerStream::new(grpc_listener);
    let served = Server::builder()
        .add_service(handler.into_service())
        .serve_with_incoming_shutdown(incoming, {
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        })
        .await;

    // Stop the metrics server whether gRPC exited cleanly or not.
    cancel.cancel();
    match http_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "metrics server failed"),
        Err(e) => error!(error = %e, "metrics server task panicked"),
    }
    pool.close().await;
    served?;

    info!("shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to register SIGTERM handler, ctrl+c only"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
}
