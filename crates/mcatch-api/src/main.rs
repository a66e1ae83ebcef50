//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};

use mcatch_api::{create_router, init_tracing, metrics, ApiConfig, AppState};
use mcatch_models::TrailerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info")?;

    info!("Starting mcatch-api");

    let config = ApiConfig::from_env();
    let trailer = TrailerConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        upload_dir = %config.upload_dir.display(),
        output_dir = %config.output_dir.display(),
        max_concurrent_runs = config.max_concurrent_runs,
        "API config loaded"
    );

    if let Err(e) = mcatch_media::check_ffmpeg().and_then(|_| mcatch_media::check_ffprobe()) {
        warn!(error = %e, "FFmpeg tools missing, uploads will fail");
    }

    let state = AppState::new(config.clone(), trailer)
        .await
        .context("failed to create application state")?;

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let app = create_router(state.clone(), metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, cancelling running analyses");
    state.begin_shutdown();
}
