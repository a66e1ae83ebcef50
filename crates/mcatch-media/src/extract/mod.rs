//! Signal extraction: decode the source once per track and reduce it to
//! time-indexed audio and visual signals.

pub mod audio;
pub mod spectrum;
pub mod video;

use std::path::Path;

use tracing::{info, warn};

use mcatch_models::{SignalSet, TrailerConfig};

use crate::cancel::{ensure_active, CancelReceiver};
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::probe::VideoInfo;

pub use audio::{extract_audio_signals, rms_energy, zero_crossing_rate, AudioFeatureExtractor};
pub use spectrum::SpectralCentroid;
pub use video::{extract_video_signals, sampling_fps, FrameAnalyzer, FrameFeatures};

/// Signals of one source plus whether audio had to be skipped.
#[derive(Debug, Clone)]
pub struct ExtractedSignals {
    pub signals: SignalSet,
    /// True when the audio track was missing or undecodable
    pub audio_degraded: bool,
}

/// Extract every signal of a probed source.
///
/// Audio and video are decoded concurrently. A missing audio track degrades
/// the run to visual-only scoring; an undecodable video track is fatal.
pub async fn extract_signals(
    path: &Path,
    info: &VideoInfo,
    config: &TrailerConfig,
    cancel: Option<&CancelReceiver>,
) -> MediaResult<ExtractedSignals> {
    ensure_active(cancel)?;

    let (visual, audio) = tokio::join!(
        extract_video_signals(path, info, config, cancel),
        extract_audio_signals(path, info, config, cancel),
    );
    let visual = visual?;

    // Containers without a reported duration fall back to the decoded frames.
    let duration = if info.duration > 0.0 {
        info.duration
    } else {
        visual[0].duration()
    };

    let mut signals = SignalSet::new(duration);
    for signal in visual {
        signals.insert(signal);
    }

    let audio_degraded = match audio {
        Ok(audio) => {
            for signal in audio {
                signals.insert(signal);
            }
            false
        }
        Err(MediaError::NoAudioTrack) => {
            warn!(
                path = %path.display(),
                "No decodable audio track, scoring with visual features only"
            );
            metrics::record_audio_degraded();
            true
        }
        Err(e) => return Err(e),
    };

    ensure_active(cancel)?;

    info!(
        duration_secs = duration,
        has_audio = signals.has_audio,
        "Signal extraction complete"
    );

    Ok(ExtractedSignals {
        signals,
        audio_degraded,
    })
}
