//! Excitement scoring: per-kind min/max normalization and a weighted sum.

use mcatch_models::{FeatureVector, FeatureWeights, ScoredWindow, SignalKind};

use crate::error::{MediaError, MediaResult, Stage};

/// Feature ranges narrower than this (relative to magnitude) count as constant.
const RANGE_EPSILON: f64 = 1e-9;

/// Scores are rounded to this resolution; smaller differences are summation noise.
const SCORE_RESOLUTION: f64 = 1e-12;

/// Observed range of each feature kind across all windows.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    min: [f64; SignalKind::COUNT],
    max: [f64; SignalKind::COUNT],
}

impl NormalizationStats {
    pub fn collect(features: &[FeatureVector]) -> Self {
        if features.is_empty() {
            return Self {
                min: [0.0; SignalKind::COUNT],
                max: [0.0; SignalKind::COUNT],
            };
        }

        let mut min = [f64::INFINITY; SignalKind::COUNT];
        let mut max = [f64::NEG_INFINITY; SignalKind::COUNT];
        for fv in features {
            for (i, &v) in fv.values().iter().enumerate() {
                min[i] = min[i].min(v);
                max[i] = max[i].max(v);
            }
        }
        Self { min, max }
    }

    pub fn range(&self, kind: SignalKind) -> (f64, f64) {
        (self.min[kind.index()], self.max[kind.index()])
    }

    /// Map a feature into `[0, 1]`. A constant feature maps to 0.
    pub fn normalize(&self, kind: SignalKind, value: f64) -> f64 {
        let (min, max) = self.range(kind);
        let span = max - min;
        if span <= RANGE_EPSILON * max.abs().max(min.abs()).max(1.0) {
            return 0.0;
        }
        ((value - min) / span).clamp(0.0, 1.0)
    }
}

/// Weighted sum of the normalized features of one window.
pub fn score_window(fv: &FeatureVector, stats: &NormalizationStats, weights: &FeatureWeights) -> f64 {
    let score: f64 = SignalKind::ALL
        .iter()
        .map(|&kind| weights.get(kind) * stats.normalize(kind, fv.get(kind)))
        .sum();
    (score / SCORE_RESOLUTION).round() * SCORE_RESOLUTION
}

/// Score every window, producing the excitement curve.
pub fn score_windows(features: &[FeatureVector], weights: &FeatureWeights) -> MediaResult<Vec<ScoredWindow>> {
    let stats = NormalizationStats::collect(features);
    features
        .iter()
        .map(|fv| {
            let score = score_window(fv, &stats, weights);
            if score.is_finite() {
                Ok(ScoredWindow::new(fv.window, score))
            } else {
                Err(MediaError::internal(
                    Stage::Scoring,
                    Some(fv.window.index),
                    format!("non-finite score {score}"),
                ))
            }
        })
        .collect()
}
