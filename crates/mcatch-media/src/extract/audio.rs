//! Per-frame audio features: RMS energy, zero-crossing rate, spectral centroid.
//!
//! The audio track is decoded by FFmpeg to mono `f32le` at the configured
//! sample rate and streamed through [`AudioFeatureExtractor`] in chunks, so
//! memory use does not grow with the source length.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use mcatch_models::{RawSignal, SignalKind, TrailerConfig};

use super::spectrum::SpectralCentroid;
use crate::cancel::{ensure_active, CancelReceiver};
use crate::command::PipedDecoder;
use crate::error::{MediaError, MediaResult, Stage};
use crate::probe::VideoInfo;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Incremental frame-level audio analyzer.
///
/// Frame `i` covers samples `[i * hop, i * hop + frame)`; a trailing partial
/// frame is not analyzed.
pub struct AudioFeatureExtractor {
    frame_len: usize,
    hop_len: usize,
    feature_rate: f64,
    pending: Vec<f32>,
    samples_seen: usize,
    centroid: SpectralCentroid,
    energy: Vec<f64>,
    zero_crossing: Vec<f64>,
    spectral_centroid: Vec<f64>,
}

impl AudioFeatureExtractor {
    pub fn new(sample_rate: u32, frame_secs: f64, hop_secs: f64) -> Self {
        let rate = f64::from(sample_rate);
        let frame_len = ((frame_secs * rate).round() as usize).max(1);
        let hop_len = ((hop_secs * rate).round() as usize).clamp(1, frame_len);
        Self {
            frame_len,
            hop_len,
            feature_rate: rate / hop_len as f64,
            pending: Vec::with_capacity(frame_len * 2),
            samples_seen: 0,
            centroid: SpectralCentroid::new(frame_len, sample_rate),
            energy: Vec::new(),
            zero_crossing: Vec::new(),
            spectral_centroid: Vec::new(),
        }
    }

    pub fn from_config(config: &TrailerConfig) -> Self {
        Self::new(config.audio_sample_rate, config.audio_frame_s, config.audio_hop_s)
    }

    /// Feed decoded samples; every complete frame is analyzed immediately.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.samples_seen += samples.len();
        self.pending.extend_from_slice(samples);

        let mut offset = 0;
        while self.pending.len() - offset >= self.frame_len {
            let frame = &self.pending[offset..offset + self.frame_len];
            self.energy.push(rms_energy(frame));
            self.zero_crossing.push(zero_crossing_rate(frame));
            self.spectral_centroid.push(self.centroid.compute(frame));
            offset += self.hop_len;
        }
        self.pending.drain(..offset);
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    pub fn frames(&self) -> usize {
        self.energy.len()
    }

    /// Finish and return the energy, zero-crossing and centroid signals.
    pub fn finish(self) -> [RawSignal; 3] {
        [
            RawSignal::new(SignalKind::AudioEnergy, self.feature_rate, self.energy),
            RawSignal::new(SignalKind::ZeroCrossing, self.feature_rate, self.zero_crossing),
            RawSignal::new(SignalKind::SpectralCentroid, self.feature_rate, self.spectral_centroid),
        ]
    }
}

/// Root-mean-square amplitude.
pub fn rms_energy(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

/// Number of sign changes between adjacent samples divided by the frame length.
pub fn zero_crossing_rate(frame: &[f32]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

/// Decode the audio track and compute its frame-level signals.
///
/// Fails with [`MediaError::NoAudioTrack`] when the source has no audio stream
/// or the stream yields no samples.
pub async fn extract_audio_signals(
    path: &Path,
    info: &VideoInfo,
    config: &TrailerConfig,
    cancel: Option<&CancelReceiver>,
) -> MediaResult<[RawSignal; 3]> {
    if !info.has_audio {
        return Err(MediaError::NoAudioTrack);
    }

    let args: Vec<String> = vec![
        "-vn".into(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        config.audio_sample_rate.to_string(),
        "-f".into(),
        "f32le".into(),
    ];
    let mut decoder = PipedDecoder::spawn(path, &args, Stage::AudioExtraction)?;
    let mut extractor = AudioFeatureExtractor::from_config(config);

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut carry: Vec<u8> = Vec::with_capacity(4);
    let mut samples: Vec<f32> = Vec::with_capacity(READ_CHUNK_BYTES / 4 + 1);

    loop {
        if let Err(e) = ensure_active(cancel) {
            decoder.abort().await;
            return Err(e);
        }

        let n = decoder.stdout().read(&mut chunk).await?;
        if n == 0 {
            break;
        }

        // f32 samples can straddle read boundaries.
        carry.extend_from_slice(&chunk[..n]);
        let whole = carry.len() / 4 * 4;
        samples.clear();
        samples.extend(
            carry[..whole]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        carry.drain(..whole);
        extractor.push_samples(&samples);
    }

    let exit = decoder.finish().await?;
    if extractor.samples_seen() == 0 {
        debug!(stderr = %exit.stderr, "Audio decode produced no samples");
        return Err(MediaError::NoAudioTrack);
    }
    if !exit.success {
        warn!(
            exit_code = ?exit.code,
            stderr = %exit.stderr,
            "Audio decoder exited with error after producing samples, using partial audio"
        );
    }

    debug!(
        samples = extractor.samples_seen(),
        frames = extractor.frames(),
        "Audio features extracted"
    );

    Ok(extractor.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_rate_follows_rounded_hop() {
        // 50 ms at 22050 Hz is not a whole number of samples.
        let extractor = AudioFeatureExtractor::new(22050, 0.1, 0.05);
        let rate = 22050.0 / extractor.hop_len as f64;
        let [energy, zcr, centroid] = extractor.finish();

        assert_eq!(energy.sample_rate_hz, rate);
        assert_eq!(zcr.sample_rate_hz, rate);
        assert_eq!(centroid.sample_rate_hz, rate);
        assert!((rate - 20.0).abs() < 0.02);
    }

    #[test]
    fn test_rms_energy() {
        assert_eq!(rms_energy(&[]), 0.0);
        assert!((rms_energy(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-9);
        assert_eq!(rms_energy(&[0.0; 16]), 0.0);
    }

    #[test]
    fn test_zero_crossing_rate() {
        assert!((zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0]) - 0.75).abs() < 1e-9);
        assert_eq!(zero_crossing_rate(&[0.3, 0.2, 0.1, 0.4]), 0.0);
        assert_eq!(zero_crossing_rate(&[1.0]), 0.0);
    }

    #[test]
    fn test_frame_count_follows_hop() {
        // 1000 Hz, 10-sample frames, 5-sample hop
        let mut extractor = AudioFeatureExtractor::new(1000, 0.01, 0.005);
        extractor.push_samples(&[0.1; 100]);
        // Starts at 0, 5, ..., 90
        assert_eq!(extractor.frames(), 19);

        let [energy, zcr, centroid] = extractor.finish();
        assert_eq!(energy.kind, SignalKind::AudioEnergy);
        assert!((energy.sample_rate_hz - 200.0).abs() < 1e-9);
        assert_eq!(zcr.len(), 19);
        assert_eq!(centroid.len(), 19);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let signal: Vec<f32> = (0..4000).map(|i| ((i as f32) * 0.37).sin()).collect();

        let mut whole = AudioFeatureExtractor::new(8000, 0.1, 0.05);
        whole.push_samples(&signal);

        let mut chunked = AudioFeatureExtractor::new(8000, 0.1, 0.05);
        for chunk in signal.chunks(333) {
            chunked.push_samples(chunk);
        }

        assert_eq!(whole.finish(), chunked.finish());
    }

    #[test]
    fn test_loud_frames_have_more_energy() {
        let mut extractor = AudioFeatureExtractor::new(1000, 0.1, 0.1);
        extractor.push_samples(&[0.01; 100]);
        extractor.push_samples(&[0.8; 100]);
        let [energy, _, _] = extractor.finish();
        assert_eq!(energy.len(), 2);
        assert!(energy.values[1] > energy.values[0] * 10.0);
    }

    #[tokio::test]
    async fn test_missing_audio_stream_is_reported() {
        let info = VideoInfo {
            duration: 5.0,
            width: 160,
            height: 90,
            fps: 25.0,
            codec: "h264".into(),
            has_audio: false,
            audio_sample_rate: None,
        };
        let err = extract_audio_signals(Path::new("silent.mp4"), &info, &TrailerConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoAudioTrack));
    }
}
