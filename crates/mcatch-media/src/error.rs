//! Error types for media operations.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use mcatch_models::ConfigError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Pipeline stage, used to locate internal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Probe,
    AudioExtraction,
    VideoExtraction,
    Windowing,
    Scoring,
    Selection,
    Assembly,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Probe => "probe",
            Stage::AudioExtraction => "audio_extraction",
            Stage::VideoExtraction => "video_extraction",
            Stage::Windowing => "windowing",
            Stage::Scoring => "scoring",
            Stage::Selection => "selection",
            Stage::Assembly => "assembly",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during analysis and rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Source unreadable: {}: {reason}", .path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Source has no decodable audio track")]
    NoAudioTrack,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error(
        "Internal error in {stage} stage{}: {message}",
        .window.map(|w| format!(" at window {w}")).unwrap_or_default()
    )]
    Internal {
        stage: Stage,
        window: Option<usize>,
        message: String,
    },

    #[error("Cut list is empty, nothing to render")]
    EmptyCutList,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a source unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error located at a stage and optional window index.
    pub fn internal(stage: Stage, window: Option<usize>, message: impl Into<String>) -> Self {
        Self::Internal {
            stage,
            window,
            message: message.into(),
        }
    }

    /// Whether the failure is caused by the input rather than the system.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnreadable { .. } | Self::NoAudioTrack | Self::InvalidConfig(_)
        )
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FfmpegNotFound => "ffmpeg_not_found",
            Self::FfprobeNotFound => "ffprobe_not_found",
            Self::SourceUnreadable { .. } => "source_unreadable",
            Self::NoAudioTrack => "no_audio_track",
            Self::FfmpegFailed { .. } => "ffmpeg_failed",
            Self::Internal { .. } => "internal",
            Self::EmptyCutList => "empty_cut_list",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Cancelled => "cancelled",
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io",
            Self::JsonParse(_) => "json_parse",
        }
    }
}
