//! Health check handler.

use axum::extract::State;
use axum::Json;
use mcatch_media::{check_ffmpeg, check_ffprobe};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ffmpeg: bool,
    pub ffprobe: bool,
    /// Analysis slots currently free
    pub available_runs: usize,
}

/// Liveness probe; reports `degraded` when the FFmpeg tools are missing.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ffmpeg = check_ffmpeg().is_ok();
    let ffprobe = check_ffprobe().is_ok();

    Json(HealthResponse {
        status: if ffmpeg && ffprobe { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ffmpeg,
        ffprobe,
        available_runs: state.runs.available_permits(),
    })
}
