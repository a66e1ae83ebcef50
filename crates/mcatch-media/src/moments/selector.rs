//! Peak picking, moment construction, de-duplication and truncation.

use mcatch_models::{Moment, ScoredWindow, TrailerConfig, TrailerPlan, Window};

/// Tolerance when comparing the running trailer length against its cap.
const DURATION_EPSILON: f64 = 1e-9;

/// Indices of local maxima of the curve.
///
/// A sample is a peak when it is strictly greater than its left neighbor and
/// at least its right neighbor; a missing neighbor always passes. A plateau
/// therefore reports its first sample only.
pub fn detect_peaks(scores: &[f64]) -> Vec<usize> {
    (0..scores.len())
        .filter(|&i| {
            let rises = i == 0 || scores[i] > scores[i - 1];
            let holds = i + 1 == scores.len() || scores[i] >= scores[i + 1];
            rises && holds
        })
        .collect()
}

/// Linearly interpolated percentile (0-100) of the values; 0 when empty.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Peaks that clear both the absolute floor and the percentile threshold.
pub fn qualifying_peaks(curve: &[ScoredWindow], min_score: f64, height_percentile: f64) -> Vec<ScoredWindow> {
    let scores: Vec<f64> = curve.iter().map(|w| w.score).collect();
    let threshold = percentile(&scores, height_percentile);
    detect_peaks(&scores)
        .into_iter()
        .map(|i| curve[i])
        .filter(|w| w.score > min_score && w.score >= threshold)
        .collect()
}

/// A `duration`-long moment centered on the window midpoint.
///
/// Near either end of the source the interval is shifted inward so it keeps
/// its full length; only a source shorter than `duration` yields `[0, source]`.
pub fn build_moment(window: &Window, score: f64, duration: f64, source_duration: f64) -> Moment {
    if source_duration <= duration {
        return Moment::new(0.0, source_duration.max(0.0), score);
    }
    let start = (window.midpoint() - duration / 2.0).clamp(0.0, source_duration - duration);
    Moment::new(start, (start + duration).min(source_duration), score)
}

/// Greedy de-duplication: highest score first, rejecting any candidate that
/// overlaps an accepted moment. Result is in acceptance order.
pub fn decluster(mut candidates: Vec<Moment>) -> Vec<Moment> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.start.total_cmp(&b.start)));

    let mut accepted: Vec<Moment> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !accepted.iter().any(|m| m.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }
    accepted
}

/// Keep the `max_moments` best, then drop the lowest scores until the total
/// fits within `max_duration`. Input must be in descending score order.
pub fn truncate(mut ranked: Vec<Moment>, max_moments: usize, max_duration: f64) -> Vec<Moment> {
    ranked.truncate(max_moments);
    let mut total: f64 = ranked.iter().map(Moment::duration).sum();
    while total > max_duration + DURATION_EPSILON {
        match ranked.pop() {
            Some(m) => total -= m.duration(),
            None => break,
        }
    }
    ranked
}

/// Turn an excitement curve into a chronologically ordered trailer plan.
pub fn select_moments(curve: &[ScoredWindow], source_duration: f64, config: &TrailerConfig) -> TrailerPlan {
    let candidates = qualifying_peaks(curve, config.min_peak_score, config.peak_height_percentile)
        .iter()
        .map(|w| build_moment(&w.window, w.score, config.moment_duration_s, source_duration))
        .collect();

    let mut moments = truncate(
        decluster(candidates),
        config.num_moments,
        config.max_trailer_duration_s,
    );
    moments.sort_by(|a, b| a.start.total_cmp(&b.start));

    TrailerPlan::from_moments(moments, source_duration)
}
