//! Application state.

use std::sync::Arc;

use mcatch_media::{cancel_channel, CancelReceiver, MomentCatcher};
use mcatch_models::TrailerConfig;
use tokio::sync::{watch, Semaphore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub catcher: Arc<MomentCatcher>,
    /// One permit per concurrently running analysis
    pub runs: Arc<Semaphore>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: CancelReceiver,
}

impl AppState {
    /// Create new application state, creating the upload and output directories.
    pub async fn new(config: ApiConfig, trailer: TrailerConfig) -> anyhow::Result<Self> {
        let catcher = MomentCatcher::new(trailer)?;

        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&config.output_dir).await?;

        let (shutdown_tx, shutdown_rx) = cancel_channel();

        Ok(Self {
            runs: Arc::new(Semaphore::new(config.max_concurrent_runs.max(1))),
            config,
            catcher: Arc::new(catcher),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Receiver that flips to `true` once the server starts shutting down.
    pub fn shutdown_signal(&self) -> CancelReceiver {
        self.shutdown_rx.clone()
    }

    /// Cancel every in-flight analysis.
    pub fn begin_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
