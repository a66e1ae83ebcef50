//! Analysis report returned by a full pipeline run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::moment::{ScoredWindow, TrailerPlan};

/// Properties of the analyzed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Whether the source carries an audio stream
    pub has_audio: bool,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub source: SourceInfo,
    /// Excitement curve, one entry per analysis window
    pub curve: Vec<ScoredWindow>,
    /// Selected moments in playback order
    pub plan: TrailerPlan,
    /// True when audio could not be decoded and scoring used visual features only
    pub audio_degraded: bool,
}

impl AnalysisReport {
    /// Highest score on the excitement curve, if any window was scored.
    pub fn peak_score(&self) -> Option<f64> {
        self.curve.iter().map(|w| w.score).reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Window;

    #[test]
    fn test_report_serialization() {
        let report = AnalysisReport {
            source: SourceInfo {
                duration: 10.0,
                width: 1920,
                height: 1080,
                fps: 30.0,
                has_audio: false,
            },
            curve: vec![
                ScoredWindow::new(Window::new(0, 0.0, 3.0), 0.2),
                ScoredWindow::new(Window::new(1, 1.0, 4.0), 0.7),
            ],
            plan: TrailerPlan::empty(10.0),
            audio_degraded: true,
        };

        assert_eq!(report.peak_score(), Some(0.7));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["audio_degraded"], true);
        assert_eq!(json["curve"][1]["window"]["index"], 1);
        assert!(json["plan"]["moments"].as_array().unwrap().is_empty());
    }
}
