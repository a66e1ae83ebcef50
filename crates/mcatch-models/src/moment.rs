//! Scored windows, selected moments, trailer plans and cut lists.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_timestamp;
use crate::window::Window;

/// A window with its excitement score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredWindow {
    pub window: Window,
    /// Weighted sum of normalized features, in `[0, sum of weights]`
    pub score: f64,
}

impl ScoredWindow {
    pub fn new(window: Window, score: f64) -> Self {
        Self { window, score }
    }
}

/// A selected interval built around an excitement peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Moment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Score of the peak window this moment was built around
    pub score: f64,
}

impl Moment {
    pub fn new(start: f64, end: f64, score: f64) -> Self {
        Self { start, end, score }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the two intervals share any time. Touching intervals do not overlap.
    pub fn overlaps(&self, other: &Moment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Chronologically ordered, non-overlapping moments to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrailerPlan {
    /// Moments ordered by start time
    pub moments: Vec<Moment>,
    /// Sum of moment durations in seconds
    pub total_duration: f64,
    /// Duration of the analyzed source in seconds
    pub source_duration: f64,
}

impl TrailerPlan {
    /// A plan with no moments.
    pub fn empty(source_duration: f64) -> Self {
        Self {
            moments: Vec::new(),
            total_duration: 0.0,
            source_duration,
        }
    }

    /// Build a plan, computing the total duration.
    pub fn from_moments(moments: Vec<Moment>, source_duration: f64) -> Self {
        let total_duration = moments.iter().map(Moment::duration).sum();
        Self {
            moments,
            total_duration,
            source_duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }
}

/// One `(start, end)` pair of the cut list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cut {
    pub start: f64,
    pub end: f64,
}

impl Cut {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Validated cut list handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CutList {
    pub cuts: Vec<Cut>,
    pub total_duration: f64,
}

impl CutList {
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cut> {
        self.cuts.iter()
    }
}
