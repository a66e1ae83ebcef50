//! Moment Catcher media pipeline.
//!
//! This crate provides:
//! - FFprobe inspection and FFmpeg command building with cancellation
//! - Streaming audio and visual signal extraction
//! - Windowing, excitement scoring and peak-based moment selection
//! - Cut list assembly and trailer rendering

pub mod cancel;
pub mod command;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod moments;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod trailer;

pub use cancel::{cancel_channel, CancelReceiver};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult, Stage};
pub use extract::{extract_signals, ExtractedSignals};
pub use pipeline::{plan_from_signals, MomentCatcher, ScoredPlan, TrailerOutcome};
pub use probe::{probe_video, VideoInfo};
pub use trailer::{assemble_cut_list, render_trailer};
