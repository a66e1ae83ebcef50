//! Shared data models for the Moment Catcher pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Raw per-frame signals and their kinds
//! - Analysis windows and per-window feature vectors
//! - Scored windows, selected moments and trailer plans
//! - Cut lists handed to the renderer
//! - Pipeline configuration and feature weights

pub mod config;
pub mod moment;
pub mod report;
pub mod signal;
pub mod timestamp;
pub mod window;

// Re-export common types
pub use config::{ConfigError, FeatureWeights, TrailerConfig};
pub use moment::{Cut, CutList, Moment, ScoredWindow, TrailerPlan};
pub use report::{AnalysisReport, SourceInfo};
pub use signal::{RawSignal, SignalKind, SignalSet};
pub use timestamp::format_timestamp;
pub use window::{FeatureVector, Window};
