//! Analysis windows and per-window features.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::signal::SignalKind;

/// A half-open analysis interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Window {
    /// Position in the window sequence (0-indexed)
    pub index: usize,
    /// Start time in seconds (inclusive)
    pub start: f64,
    /// End time in seconds (exclusive)
    pub end: f64,
}

impl Window {
    pub fn new(index: usize, start: f64, end: f64) -> Self {
        Self { index, start, end }
    }

    /// Length of the window in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Center of the window in seconds.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Per-window aggregate of every signal kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub window: Window,
    values: [f64; SignalKind::COUNT],
}

impl FeatureVector {
    /// A vector with every feature set to zero.
    pub fn zeros(window: Window) -> Self {
        Self {
            window,
            values: [0.0; SignalKind::COUNT],
        }
    }

    pub fn with_values(window: Window, values: [f64; SignalKind::COUNT]) -> Self {
        Self { window, values }
    }

    pub fn get(&self, kind: SignalKind) -> f64 {
        self.values[kind.index()]
    }

    pub fn set(&mut self, kind: SignalKind, value: f64) {
        self.values[kind.index()] = value;
    }

    /// Values in [`SignalKind::ALL`] order.
    pub fn values(&self) -> &[f64; SignalKind::COUNT] {
        &self.values
    }
}
