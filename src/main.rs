use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use view_snapshot::{api::create_router, application::builder::ApplicationBuilder, logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let _log_guard = logging::init(&config)?;
    info!("Starting view snapshot service");

    let builder = ApplicationBuilder::new(config)
        .with_infrastructure()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize cache: {}", e))?;

    let state = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build application: {}", e))?;

    if let Some(limiter) = &state.rate_limiter {
        limiter.spawn_cleanup(Duration::from_secs(300));
        info!(
            "Rate limiting enabled: {} requests per minute",
            builder.config().rate_limit_per_minute
        );
    }

    // Start artifact sweeper in background
    match builder
        .build_sweeper()
        .map_err(|e| anyhow::anyhow!("Failed to build sweeper: {}", e))?
    {
        Some(sweeper) => {
            tokio::spawn(sweeper.run());
            info!("Artifact sweeper started");
        }
        None => info!("Artifact sweeper disabled"),
    }

    let app = create_router(state);

    // Start server
    let listen_addr = builder.config().listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;
    info!("Listening on {}", listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
