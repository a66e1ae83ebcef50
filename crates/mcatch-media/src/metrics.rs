//! Pipeline metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder.

use metrics::{counter, histogram};

use crate::error::MediaError;

/// Metric names as constants for consistency.
pub mod names {
    pub const ANALYSIS_DURATION_SECONDS: &str = "mcatch_analysis_duration_seconds";
    pub const ANALYSES_TOTAL: &str = "mcatch_analyses_total";
    pub const ANALYSIS_FAILURES_TOTAL: &str = "mcatch_analysis_failures_total";
    pub const WINDOWS_SCORED_TOTAL: &str = "mcatch_windows_scored_total";
    pub const MOMENTS_SELECTED: &str = "mcatch_moments_selected";
    pub const AUDIO_DEGRADED_TOTAL: &str = "mcatch_audio_degraded_total";
    pub const RENDER_DURATION_SECONDS: &str = "mcatch_render_duration_seconds";
    pub const RENDERS_TOTAL: &str = "mcatch_renders_total";
}

/// Record a completed analysis.
pub fn record_analysis(duration_secs: f64, windows: usize, moments: usize) {
    counter!(names::ANALYSES_TOTAL).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS).record(duration_secs);
    counter!(names::WINDOWS_SCORED_TOTAL).increment(windows as u64);
    histogram!(names::MOMENTS_SELECTED).record(moments as f64);
}

/// Record a failed analysis or render.
pub fn record_failure(stage: &str, error: &MediaError) {
    let labels = [
        ("stage", stage.to_string()),
        ("kind", error.kind().to_string()),
    ];
    counter!(names::ANALYSIS_FAILURES_TOTAL, &labels).increment(1);
}

/// Record a run that fell back to visual-only scoring.
pub fn record_audio_degraded() {
    counter!(names::AUDIO_DEGRADED_TOTAL).increment(1);
}

/// Record a finished render.
pub fn record_render(duration_secs: f64) {
    counter!(names::RENDERS_TOTAL).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}
