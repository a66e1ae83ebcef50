//! Render a cut list to a single video file.
//!
//! Each cut is re-encoded to its own segment with a fast keyframe seek
//! followed by an accurate output seek, then the segments are joined with
//! the concat demuxer using stream copy.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use mcatch_models::CutList;

use crate::cancel::{ensure_active, CancelReceiver};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// Distance of the keyframe seek ahead of the requested start.
const PRE_SEEK_SECS: f64 = 5.0;

/// Fixed allowance on top of the per-second budget of an FFmpeg step.
const TIMEOUT_BASE_SECS: u64 = 60;

/// Wall-clock seconds allowed per second of output media.
const TIMEOUT_SECS_PER_MEDIA_SEC: f64 = 20.0;

/// Kill an encode step that runs longer than this for `media_secs` of output.
pub fn step_timeout_secs(media_secs: f64) -> u64 {
    let budget = (media_secs.max(0.0) * TIMEOUT_SECS_PER_MEDIA_SEC).ceil() as u64;
    TIMEOUT_BASE_SECS + budget
}

/// Extraction command for one cut.
pub fn segment_command(source: &Path, start: f64, duration: f64, output: &Path) -> FfmpegCommand {
    let fast_seek = (start - PRE_SEEK_SECS).max(0.0);
    FfmpegCommand::new(source, output)
        .seek(fast_seek)
        .output_args([
            "-ss".to_string(),
            format!("{:.3}", start - fast_seek),
            "-t".to_string(),
            format!("{:.3}", duration),
        ])
        .video_codec("libx264")
        .preset("veryfast")
        .crf(20)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_args(["-avoid_negative_ts", "make_zero"])
}

/// Concat demuxer list for the given segment files.
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', r"'\''")))
        .collect()
}

/// Render `cuts` of `source` into `output`.
pub async fn render_trailer(
    source: &Path,
    cuts: &CutList,
    output: &Path,
    cancel: Option<&CancelReceiver>,
) -> MediaResult<()> {
    if cuts.is_empty() {
        return Err(MediaError::EmptyCutList);
    }

    let started = Instant::now();
    info!(
        source = %source.display(),
        output = %output.display(),
        cuts = cuts.len(),
        total_secs = cuts.total_duration,
        "Rendering trailer"
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_dir = tempfile::tempdir()?;
    let mut segments = Vec::with_capacity(cuts.len());

    for (i, cut) in cuts.iter().enumerate() {
        ensure_active(cancel)?;

        let segment = temp_dir.path().join(format!("seg_{:04}.mp4", i));
        debug!(segment = i, cut = %cut, "Extracting trailer segment");

        let cmd = segment_command(source, cut.start, cut.duration(), &segment);
        let total_ms = (cut.duration() * 1000.0) as i64;
        FfmpegRunner::new()
            .with_cancel(cancel.cloned())
            .with_timeout(step_timeout_secs(cut.duration()))
            .run_with_progress(&cmd, move |p| {
                debug!(
                    segment = i,
                    percent = p.percentage(total_ms),
                    eta_secs = p.eta_seconds(total_ms),
                    "Segment progress"
                );
            })
            .await?;
        segments.push(segment);
    }

    ensure_active(cancel)?;

    let list_path = temp_dir.path().join("concat.txt");
    tokio::fs::write(&list_path, concat_list(&segments)).await?;

    let concat = FfmpegCommand::new(&list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .codec_copy()
        .output_args(["-movflags", "+faststart"]);
    FfmpegRunner::new()
        .with_cancel(cancel.cloned())
        .with_timeout(step_timeout_secs(cuts.total_duration))
        .run(&concat)
        .await?;

    let elapsed = started.elapsed().as_secs_f64();
    metrics::record_render(elapsed);
    info!(
        output = %output.display(),
        elapsed_secs = elapsed,
        "Trailer rendered"
    );

    Ok(())
}
