//! Raw time-indexed signals produced by the extractors.

use std::fmt;
use std::ops::Range;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of low-level signal extracted from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Root-mean-square amplitude per audio frame.
    AudioEnergy,
    /// Fraction of sign changes per audio frame.
    ZeroCrossing,
    /// Amplitude-weighted mean frequency (Hz) per audio frame.
    SpectralCentroid,
    /// Mean absolute luma difference against the previous sampled frame.
    Motion,
    /// Fraction of pixels classified as edges.
    EdgeDensity,
    /// Variance of luma across the frame.
    BrightnessVariance,
    /// Variance of chroma across the frame.
    ColorVariance,
}

impl SignalKind {
    /// Number of signal kinds.
    pub const COUNT: usize = 7;

    /// All kinds, in feature-vector order.
    pub const ALL: [SignalKind; Self::COUNT] = [
        SignalKind::AudioEnergy,
        SignalKind::ZeroCrossing,
        SignalKind::SpectralCentroid,
        SignalKind::Motion,
        SignalKind::EdgeDensity,
        SignalKind::BrightnessVariance,
        SignalKind::ColorVariance,
    ];

    /// Position of this kind inside a feature vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this signal comes from the audio track.
    pub fn is_audio(self) -> bool {
        matches!(
            self,
            SignalKind::AudioEnergy | SignalKind::ZeroCrossing | SignalKind::SpectralCentroid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::AudioEnergy => "audio_energy",
            SignalKind::ZeroCrossing => "zero_crossing",
            SignalKind::SpectralCentroid => "spectral_centroid",
            SignalKind::Motion => "motion",
            SignalKind::EdgeDensity => "edge_density",
            SignalKind::BrightnessVariance => "brightness_variance",
            SignalKind::ColorVariance => "color_variance",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, uniformly sampled numeric series.
///
/// Sample `i` is timestamped at `i / sample_rate_hz` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    pub kind: SignalKind,
    pub sample_rate_hz: f64,
    pub values: Vec<f64>,
}

impl RawSignal {
    /// Create a signal from its samples.
    pub fn new(kind: SignalKind, sample_rate_hz: f64, values: Vec<f64>) -> Self {
        Self {
            kind,
            sample_rate_hz,
            values,
        }
    }

    /// Create a signal with no samples.
    pub fn empty(kind: SignalKind, sample_rate_hz: f64) -> Self {
        Self::new(kind, sample_rate_hz, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamp of a sample in seconds.
    pub fn timestamp(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate_hz
    }

    /// Time spanned by the samples in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate_hz <= 0.0 {
            return 0.0;
        }
        self.values.len() as f64 / self.sample_rate_hz
    }

    /// Indices of the samples whose timestamps fall in `[start, end)`.
    pub fn index_range(&self, start: f64, end: f64) -> Range<usize> {
        if self.sample_rate_hz <= 0.0 || end <= start {
            return 0..0;
        }
        let lo = self.first_at_or_after(start);
        let hi = self.first_at_or_after(end);
        lo..hi.max(lo)
    }

    /// Samples whose timestamps fall in `[start, end)`.
    pub fn samples_in(&self, start: f64, end: f64) -> &[f64] {
        &self.values[self.index_range(start, end)]
    }

    fn first_at_or_after(&self, t: f64) -> usize {
        let len = self.values.len();
        if t.is_nan() || t <= 0.0 {
            return 0;
        }
        let guess = (t * self.sample_rate_hz).ceil();
        let mut i = if guess >= len as f64 { len } else { guess as usize };

        // Settle rounding in `t * rate` against the exact timestamps.
        while i > 0 && self.timestamp(i - 1) >= t {
            i -= 1;
        }
        while i < len && self.timestamp(i) < t {
            i += 1;
        }
        i
    }
}

/// The full set of signals extracted from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    /// Authoritative source duration in seconds.
    pub duration_secs: f64,
    /// Whether an audio track was decoded.
    pub has_audio: bool,
    signals: Vec<RawSignal>,
}

impl SignalSet {
    /// Create a set with an empty signal for every kind.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            has_audio: false,
            signals: SignalKind::ALL
                .iter()
                .map(|&kind| RawSignal::empty(kind, 1.0))
                .collect(),
        }
    }

    /// Replace the signal of the same kind.
    pub fn with_signal(mut self, signal: RawSignal) -> Self {
        self.insert(signal);
        self
    }

    /// Replace the signal of the same kind.
    pub fn insert(&mut self, signal: RawSignal) {
        if signal.kind.is_audio() && !signal.is_empty() {
            self.has_audio = true;
        }
        let index = signal.kind.index();
        self.signals[index] = signal;
    }

    pub fn get(&self, kind: SignalKind) -> &RawSignal {
        &self.signals[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawSignal> {
        self.signals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_matches_index() {
        for (i, kind) in SignalKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert!(SignalKind::SpectralCentroid.is_audio());
        assert!(!SignalKind::Motion.is_audio());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&SignalKind::BrightnessVariance).unwrap();
        assert_eq!(json, "\"brightness_variance\"");
    }

    #[test]
    fn test_index_range_half_open() {
        // 4 Hz: timestamps 0.0, 0.25, 0.5, ...
        let signal = RawSignal::new(SignalKind::Motion, 4.0, (0..12).map(f64::from).collect());
        assert_eq!(signal.index_range(0.5, 1.5), 2..6);
        assert_eq!(signal.samples_in(0.5, 1.0), &[2.0, 3.0]);
        assert_eq!(signal.index_range(10.0, 12.0), 12..12);
        assert_eq!(signal.index_range(1.0, 1.0), 0..0);
    }

    #[test]
    fn test_index_range_fractional_rate() {
        // 20 Hz hop: 3.0 * 20 lands on an exact sample
        let signal = RawSignal::new(SignalKind::AudioEnergy, 20.0, vec![1.0; 200]);
        assert_eq!(signal.index_range(3.0, 6.0), 60..120);
    }

    #[test]
    fn test_index_range_matches_linear_scan() {
        let signal = RawSignal::new(SignalKind::AudioEnergy, 22050.0 / 1103.0, vec![0.0; 400]);
        for step in 0..250 {
            let t = step as f64 * 0.0837;
            let expected = (0..signal.len()).find(|&i| signal.timestamp(i) >= t).unwrap_or(signal.len());
            assert_eq!(signal.first_at_or_after(t), expected, "t = {t}");
        }
        assert_eq!(signal.first_at_or_after(-1.0), 0);
        assert_eq!(signal.first_at_or_after(1e9), 400);
    }

    #[test]
    fn test_signal_set_tracks_audio() {
        let set = SignalSet::new(10.0);
        assert!(!set.has_audio);
        assert!(set.get(SignalKind::AudioEnergy).is_empty());

        let set = set.with_signal(RawSignal::new(SignalKind::AudioEnergy, 20.0, vec![0.5]));
        assert!(set.has_audio);
        assert_eq!(set.get(SignalKind::AudioEnergy).len(), 1);

        let set = SignalSet::new(10.0)
            .with_signal(RawSignal::new(SignalKind::Motion, 4.0, vec![1.0, 2.0]));
        assert!(!set.has_audio);
    }
}
