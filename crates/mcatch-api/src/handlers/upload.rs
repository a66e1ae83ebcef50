//! Upload handler: save the video, generate its trailer, report the moments.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use mcatch_models::Moment;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{warn, Instrument};

use crate::error::{ApiError, ApiResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the video.
pub const VIDEO_FIELD: &str = "video";

/// One selected moment as reported to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentData {
    pub start: f64,
    pub end: f64,
    pub score: f64,
}

impl From<&Moment> for MomentData {
    fn from(m: &Moment) -> Self {
        Self {
            start: m.start,
            end: m.end,
            score: m.score,
        }
    }
}

/// Upload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Number of selected moments
    pub moments: usize,
    /// Trailer file name for `/download`, `None` when nothing qualified
    pub output_file: Option<String>,
    pub moments_data: Vec<MomentData>,
    /// True when the source had no usable audio
    pub audio_degraded: bool,
    /// Trailer length in seconds
    pub duration: f64,
    /// Source length in seconds
    pub source_duration: f64,
}

/// Reduce a client-supplied file name to a safe basename.
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`.
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Name of the trailer rendered for an upload.
pub fn trailer_file_name(run_prefix: &str, upload_name: &str) -> String {
    let stem = Path::new(upload_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!("trailer_{run_prefix}_{stem}.mp4")
}

struct SavedUpload {
    path: PathBuf,
    name: String,
    bytes: u64,
}

async fn write_field(field: &mut Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Stream the `video` field into `dir`, prefixing the stored name with `run_prefix`.
async fn save_upload(multipart: &mut Multipart, dir: &Path, run_prefix: &str) -> ApiResult<SavedUpload> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::bad_request("No file selected"));
        }
        let name = sanitize_filename(&original).ok_or_else(|| ApiError::bad_request("Invalid file name"))?;
        let path = dir.join(format!("{run_prefix}_{name}"));

        return match write_field(&mut field, &path).await {
            Ok(bytes) => Ok(SavedUpload { path, name, bytes }),
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        };
    }

    Err(ApiError::bad_request("No video file provided"))
}

/// `POST /upload`: analyze an uploaded video and render its trailer.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    let logger = RunLogger::new("upload");

    let saved = match save_upload(&mut multipart, &state.config.upload_dir, logger.short_id()).await {
        Ok(saved) => saved,
        Err(e) => {
            logger.log_warning(&format!("rejected upload: {e}"));
            metrics::record_upload("rejected", 0);
            return Err(e);
        }
    };

    // The source is only needed while this request runs
    let upload_path = scopeguard::guard(saved.path.clone(), |path| {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    });

    logger.log_start(&format!("{} ({} bytes)", saved.name, saved.bytes));

    metrics::record_run_waiting(1.0);
    let permit = state.runs.clone().acquire_owned().await;
    metrics::record_run_waiting(-1.0);
    let _permit = permit.map_err(|_| ApiError::Unavailable("server is shutting down".to_string()))?;
    logger.log_progress(&format!(
        "analysis slot acquired, {} free",
        state.runs.available_permits()
    ));

    let output_name = trailer_file_name(logger.short_id(), &saved.name);
    let output_path = state.config.output_dir.join(&output_name);
    let cancel = state.shutdown_signal();

    let outcome = state
        .catcher
        .generate(&upload_path, &output_path, Some(&cancel))
        .instrument(logger.create_span())
        .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            logger.log_error(&e.to_string());
            metrics::record_upload("failed", saved.bytes);
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(e.into());
        }
    };

    let report = outcome.report;
    let output_file = outcome.cuts.map(|_| output_name);
    match &output_file {
        Some(name) => {
            logger.log_completion(&format!("{} moments rendered to {name}", report.plan.len()));
            metrics::record_upload("rendered", saved.bytes);
        }
        None => {
            logger.log_completion("no qualifying moments");
            metrics::record_upload("empty", saved.bytes);
        }
    }

    Ok(Json(UploadResponse {
        success: true,
        moments: report.plan.len(),
        output_file,
        moments_data: report.plan.moments.iter().map(MomentData::from).collect(),
        audio_degraded: report.audio_degraded,
        duration: report.plan.total_duration,
        source_duration: report.source.duration,
    }))
}
