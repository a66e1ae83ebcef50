//! Partition the timeline into analysis windows and aggregate signals per window.

use mcatch_models::{FeatureVector, SignalKind, SignalSet, TrailerConfig, Window};

use crate::error::{MediaError, MediaResult, Stage};

/// Tolerance for comparing window boundaries against the source duration.
const TIME_EPSILON: f64 = 1e-9;

/// Window boundaries over `[0, duration)`.
///
/// Window `k` starts at `k * stride` and spans `length` seconds, clipped to
/// the duration. A clipped window shorter than `min_fraction * length` ends
/// the sequence, except that a positive duration always yields at least one
/// window.
pub fn build_windows(duration: f64, length: f64, stride: f64, min_fraction: f64) -> Vec<Window> {
    if !(duration.is_finite() && duration > 0.0) || !(length > 0.0) || !(stride > 0.0) {
        return Vec::new();
    }

    let min_len = min_fraction * length;
    let mut windows = Vec::new();
    for k in 0usize.. {
        // Multiply rather than accumulate so boundaries do not drift.
        let start = k as f64 * stride;
        if start >= duration - TIME_EPSILON {
            break;
        }
        let end = (start + length).min(duration);
        if end - start < min_len - TIME_EPSILON && !windows.is_empty() {
            break;
        }
        windows.push(Window::new(k, start, end));
    }
    windows
}

/// Windows for a signal set under a configuration.
pub fn windows_for(signals: &SignalSet, config: &TrailerConfig) -> Vec<Window> {
    build_windows(
        signals.duration_secs,
        config.window_length_s,
        config.window_stride_s,
        config.min_window_fraction,
    )
}

/// Mean of each signal over each window.
///
/// Samples are attributed by timestamp to the half-open window `[start, end)`.
/// A window containing no samples of a signal gets 0 for that feature.
pub fn compute_features(signals: &SignalSet, windows: &[Window]) -> MediaResult<Vec<FeatureVector>> {
    for signal in signals.iter() {
        let rate = signal.sample_rate_hz;
        if !signal.is_empty() && !(rate.is_finite() && rate > 0.0) {
            return Err(MediaError::internal(
                Stage::Windowing,
                None,
                format!("{} has invalid sample rate {}", signal.kind, rate),
            ));
        }
    }

    windows
        .iter()
        .map(|window| {
            let mut fv = FeatureVector::zeros(*window);
            for kind in SignalKind::ALL {
                let samples = signals.get(kind).samples_in(window.start, window.end);
                if samples.is_empty() {
                    continue;
                }
                let mean = samples.iter().sum::<f64>() / samples.len() as f64;
                if !mean.is_finite() {
                    return Err(MediaError::internal(
                        Stage::Windowing,
                        Some(window.index),
                        format!("non-finite {kind} feature"),
                    ));
                }
                fv.set(kind, mean);
            }
            Ok(fv)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcatch_models::RawSignal;

    #[test]
    fn test_windows_cover_sixty_seconds() {
        let windows = build_windows(60.0, 3.0, 1.0, 0.5);
        // Starts 0..=58; the 59 s tail is 1 s long and dropped.
        assert_eq!(windows.len(), 59);
        assert_eq!(windows[0], Window::new(0, 0.0, 3.0));
        let last = windows.last().unwrap();
        assert!((last.start - 58.0).abs() < 1e-9);
        assert!((last.end - 60.0).abs() < 1e-9);
        for pair in windows.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
    }

    #[test]
    fn test_tiling_windows() {
        let windows = build_windows(10.0, 3.0, 3.0, 0.5);
        // 0-3, 3-6, 6-9; the 9-10 tail is too short.
        assert_eq!(windows.len(), 3);

        let windows = build_windows(11.0, 3.0, 3.0, 0.5);
        assert_eq!(windows.len(), 4);
        assert!((windows[3].end - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_source_yields_one_window() {
        let windows = build_windows(1.0, 3.0, 1.0, 0.5);
        assert_eq!(windows, vec![Window::new(0, 0.0, 1.0)]);
    }

    #[test]
    fn test_degenerate_duration() {
        assert!(build_windows(0.0, 3.0, 1.0, 0.5).is_empty());
        assert!(build_windows(f64::NAN, 3.0, 1.0, 0.5).is_empty());
    }

    #[test]
    fn test_feature_means() {
        let signals = SignalSet::new(4.0)
            .with_signal(RawSignal::new(SignalKind::Motion, 2.0, vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0]))
            .with_signal(RawSignal::new(SignalKind::AudioEnergy, 1.0, vec![0.5, 0.5]));

        let windows = build_windows(4.0, 2.0, 2.0, 0.5);
        let features = compute_features(&signals, &windows).unwrap();
        assert_eq!(features.len(), 2);

        // Window 0: motion samples at 0.0, 0.5, 1.0, 1.5
        assert!((features[0].get(SignalKind::Motion) - 4.0).abs() < 1e-9);
        assert!((features[1].get(SignalKind::Motion) - 12.0).abs() < 1e-9);
        // Audio ends at 2 s, so the second window has no samples.
        assert!((features[0].get(SignalKind::AudioEnergy) - 0.5).abs() < 1e-9);
        assert_eq!(features[1].get(SignalKind::AudioEnergy), 0.0);
        assert_eq!(features[1].get(SignalKind::EdgeDensity), 0.0);
    }

    #[test]
    fn test_invalid_rate_is_internal_error() {
        let signals = SignalSet::new(4.0).with_signal(RawSignal::new(SignalKind::Motion, 0.0, vec![1.0]));
        let windows = build_windows(4.0, 2.0, 2.0, 0.5);
        let err = compute_features(&signals, &windows).unwrap_err();
        assert!(matches!(err, MediaError::Internal { stage: Stage::Windowing, .. }));
    }

    #[test]
    fn test_non_finite_sample_names_window() {
        let signals = SignalSet::new(4.0)
            .with_signal(RawSignal::new(SignalKind::Motion, 1.0, vec![1.0, 1.0, f64::INFINITY, 1.0]));
        let windows = build_windows(4.0, 2.0, 2.0, 0.5);
        let err = compute_features(&signals, &windows).unwrap_err();
        assert!(matches!(
            err,
            MediaError::Internal {
                stage: Stage::Windowing,
                window: Some(1),
                ..
            }
        ));
    }
}
