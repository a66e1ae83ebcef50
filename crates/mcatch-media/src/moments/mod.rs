//! Moment detection: windowing, scoring and selection.
//!
//! Every function here is pure and deterministic; the same signals and
//! configuration always produce the same plan.

pub mod scorer;
pub mod selector;
pub mod windower;

pub use scorer::{score_window, score_windows, NormalizationStats};
pub use selector::{
    build_moment, decluster, detect_peaks, percentile, qualifying_peaks, select_moments, truncate,
};
pub use windower::{build_windows, compute_features, windows_for};
