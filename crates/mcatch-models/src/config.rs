//! Pipeline configuration.
//!
//! All tunables of the moment pipeline live here so that every stage is a
//! pure function of its inputs plus this structure. Defaults: 100 ms audio
//! frames with 50% hop, ten 3 s moments, 30 s trailers.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::SignalKind;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be {requirement}, got {value}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("window stride {stride}s exceeds window length {length}s")]
    StrideExceedsLength { stride: f64, length: f64 },

    #[error("audio hop {hop}s exceeds audio frame {frame}s")]
    HopExceedsFrame { hop: f64, frame: f64 },

    #[error("feature weights must not all be zero")]
    ZeroWeights,
}

/// Weight of each normalized feature in the excitement score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureWeights {
    pub audio_energy: f64,
    pub zero_crossing: f64,
    pub spectral_centroid: f64,
    pub motion: f64,
    pub edge_density: f64,
    pub brightness_variance: f64,
    pub color_variance: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            audio_energy: 0.25,
            zero_crossing: 0.15,
            spectral_centroid: 0.10,
            motion: 0.20,
            edge_density: 0.10,
            brightness_variance: 0.10,
            color_variance: 0.10,
        }
    }
}

impl FeatureWeights {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::AudioEnergy => self.audio_energy,
            SignalKind::ZeroCrossing => self.zero_crossing,
            SignalKind::SpectralCentroid => self.spectral_centroid,
            SignalKind::Motion => self.motion,
            SignalKind::EdgeDensity => self.edge_density,
            SignalKind::BrightnessVariance => self.brightness_variance,
            SignalKind::ColorVariance => self.color_variance,
        }
    }

    /// Upper bound of the excitement score.
    pub fn sum(&self) -> f64 {
        SignalKind::ALL.iter().map(|&k| self.get(k)).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in SignalKind::ALL {
            let w = self.get(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::Invalid {
                    field: "weight",
                    requirement: "finite and non-negative",
                    value: w,
                });
            }
        }
        if self.sum() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(())
    }
}

/// Configuration of one trailer analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrailerConfig {
    /// Nominal analysis window length in seconds.
    pub window_length_s: f64,

    /// Distance between consecutive window starts in seconds.
    ///
    /// Equal to `window_length_s` for tiling windows, smaller for overlap.
    pub window_stride_s: f64,

    /// Minimum fraction of the nominal length the clipped final window must
    /// keep; shorter tails are dropped.
    pub min_window_fraction: f64,

    /// Maximum number of moments in the plan.
    pub num_moments: usize,

    /// Length of each moment in seconds.
    pub moment_duration_s: f64,

    /// Upper bound on the summed moment durations in seconds.
    pub max_trailer_duration_s: f64,

    /// Frames per second decoded for visual analysis (capped at the source fps).
    pub analysis_fps: f64,

    /// Width of the downscaled analysis frame.
    pub frame_width: u32,

    /// Height of the downscaled analysis frame.
    pub frame_height: u32,

    /// Sample rate the audio track is resampled to.
    pub audio_sample_rate: u32,

    /// Audio analysis frame length in seconds.
    pub audio_frame_s: f64,

    /// Distance between audio frame starts in seconds.
    pub audio_hop_s: f64,

    /// Sobel gradient magnitude (0-255 luma scale) above which a pixel is an edge.
    pub edge_threshold: f64,

    /// Peaks must score strictly above this value.
    pub min_peak_score: f64,

    /// Peaks must score at or above this percentile (0-100) of all window scores.
    pub peak_height_percentile: f64,

    /// Feature weights for the excitement score.
    pub weights: FeatureWeights,
}

impl Default for TrailerConfig {
    fn default() -> Self {
        Self {
            window_length_s: 3.0,
            window_stride_s: 1.0,
            min_window_fraction: 0.5,
            num_moments: 10,
            moment_duration_s: 3.0,
            max_trailer_duration_s: 30.0,
            analysis_fps: 4.0,
            frame_width: 160,
            frame_height: 90,
            audio_sample_rate: 22050,
            audio_frame_s: 0.1,
            audio_hop_s: 0.05,
            edge_threshold: 100.0,
            min_peak_score: 0.0,
            peak_height_percentile: 70.0,
            weights: FeatureWeights::default(),
        }
    }
}

impl TrailerConfig {
    /// Create config from `MCATCH_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        let w = d.weights.clone();
        Self {
            window_length_s: env_or("MCATCH_WINDOW_LENGTH", d.window_length_s),
            window_stride_s: env_or("MCATCH_WINDOW_STRIDE", d.window_stride_s),
            min_window_fraction: env_or("MCATCH_MIN_WINDOW_FRACTION", d.min_window_fraction),
            num_moments: env_or("MCATCH_NUM_MOMENTS", d.num_moments),
            moment_duration_s: env_or("MCATCH_MOMENT_DURATION", d.moment_duration_s),
            max_trailer_duration_s: env_or("MCATCH_MAX_TRAILER_DURATION", d.max_trailer_duration_s),
            analysis_fps: env_or("MCATCH_ANALYSIS_FPS", d.analysis_fps),
            frame_width: env_or("MCATCH_FRAME_WIDTH", d.frame_width),
            frame_height: env_or("MCATCH_FRAME_HEIGHT", d.frame_height),
            audio_sample_rate: env_or("MCATCH_AUDIO_SAMPLE_RATE", d.audio_sample_rate),
            audio_frame_s: env_or("MCATCH_AUDIO_FRAME", d.audio_frame_s),
            audio_hop_s: env_or("MCATCH_AUDIO_HOP", d.audio_hop_s),
            edge_threshold: env_or("MCATCH_EDGE_THRESHOLD", d.edge_threshold),
            min_peak_score: env_or("MCATCH_MIN_PEAK_SCORE", d.min_peak_score),
            peak_height_percentile: env_or("MCATCH_PEAK_PERCENTILE", d.peak_height_percentile),
            weights: FeatureWeights {
                audio_energy: env_or("MCATCH_WEIGHT_AUDIO_ENERGY", w.audio_energy),
                zero_crossing: env_or("MCATCH_WEIGHT_ZERO_CROSSING", w.zero_crossing),
                spectral_centroid: env_or("MCATCH_WEIGHT_SPECTRAL_CENTROID", w.spectral_centroid),
                motion: env_or("MCATCH_WEIGHT_MOTION", w.motion),
                edge_density: env_or("MCATCH_WEIGHT_EDGE_DENSITY", w.edge_density),
                brightness_variance: env_or("MCATCH_WEIGHT_BRIGHTNESS_VARIANCE", w.brightness_variance),
                color_variance: env_or("MCATCH_WEIGHT_COLOR_VARIANCE", w.color_variance),
            },
        }
    }

    /// Builder-style setter for the number of moments.
    pub fn with_num_moments(mut self, n: usize) -> Self {
        self.num_moments = n;
        self
    }

    /// Builder-style setter for the moment length.
    pub fn with_moment_duration(mut self, secs: f64) -> Self {
        self.moment_duration_s = secs;
        self
    }

    /// Builder-style setter for the trailer length cap.
    pub fn with_max_trailer_duration(mut self, secs: f64) -> Self {
        self.max_trailer_duration_s = secs;
        self
    }

    /// Builder-style setter for window length and stride.
    pub fn with_window(mut self, length: f64, stride: f64) -> Self {
        self.window_length_s = length;
        self.window_stride_s = stride;
        self
    }

    /// Builder-style setter for the peak percentile threshold.
    pub fn with_peak_percentile(mut self, percentile: f64) -> Self {
        self.peak_height_percentile = percentile.clamp(0.0, 100.0);
        self
    }

    /// Builder-style setter for feature weights.
    pub fn with_weights(mut self, weights: FeatureWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("window_length_s", self.window_length_s)?;
        positive("window_stride_s", self.window_stride_s)?;
        positive("moment_duration_s", self.moment_duration_s)?;
        positive("max_trailer_duration_s", self.max_trailer_duration_s)?;
        positive("analysis_fps", self.analysis_fps)?;
        positive("audio_frame_s", self.audio_frame_s)?;
        positive("audio_hop_s", self.audio_hop_s)?;
        positive("frame_width", f64::from(self.frame_width))?;
        positive("frame_height", f64::from(self.frame_height))?;
        positive("audio_sample_rate", f64::from(self.audio_sample_rate))?;

        if self.window_stride_s > self.window_length_s {
            return Err(ConfigError::StrideExceedsLength {
                stride: self.window_stride_s,
                length: self.window_length_s,
            });
        }
        if self.audio_hop_s > self.audio_frame_s {
            return Err(ConfigError::HopExceedsFrame {
                hop: self.audio_hop_s,
                frame: self.audio_frame_s,
            });
        }
        if !(0.0..=1.0).contains(&self.min_window_fraction) {
            return Err(ConfigError::Invalid {
                field: "min_window_fraction",
                requirement: "within [0, 1]",
                value: self.min_window_fraction,
            });
        }
        if !(0.0..=100.0).contains(&self.peak_height_percentile) {
            return Err(ConfigError::Invalid {
                field: "peak_height_percentile",
                requirement: "within [0, 100]",
                value: self.peak_height_percentile,
            });
        }
        if !self.min_peak_score.is_finite() {
            return Err(ConfigError::Invalid {
                field: "min_peak_score",
                requirement: "finite",
                value: self.min_peak_score,
            });
        }
        if !self.edge_threshold.is_finite() || self.edge_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "edge_threshold",
                requirement: "finite and non-negative",
                value: self.edge_threshold,
            });
        }
        self.weights.validate()
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            requirement: "finite and positive",
            value,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
