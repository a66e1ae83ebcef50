//! End-to-end trailer pipeline.
//!
//! `probe -> extract -> window -> score -> select -> assemble -> render`.
//! Only decoding and rendering touch the outside world; everything between
//! is the pure [`plan_from_signals`].

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use mcatch_models::{AnalysisReport, CutList, ScoredWindow, SignalSet, TrailerConfig, TrailerPlan};

use crate::cancel::{ensure_active, CancelReceiver};
use crate::error::MediaResult;
use crate::extract::extract_signals;
use crate::metrics;
use crate::moments::{compute_features, score_windows, select_moments, windows_for};
use crate::probe::probe_video;
use crate::trailer::{assemble_cut_list, render_trailer};

/// Excitement curve and the plan selected from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlan {
    pub curve: Vec<ScoredWindow>,
    pub plan: TrailerPlan,
}

/// Window, score and select moments from already extracted signals.
pub fn plan_from_signals(signals: &SignalSet, config: &TrailerConfig) -> MediaResult<ScoredPlan> {
    config.validate()?;

    let windows = windows_for(signals, config);
    let features = compute_features(signals, &windows)?;
    let curve = score_windows(&features, &config.weights)?;
    let plan = select_moments(&curve, signals.duration_secs, config);

    Ok(ScoredPlan { curve, plan })
}

/// Report plus the cut list that was rendered, if any.
#[derive(Debug, Clone)]
pub struct TrailerOutcome {
    pub report: AnalysisReport,
    /// `None` when no moment qualified and nothing was rendered
    pub cuts: Option<CutList>,
}

/// Trailer generator bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct MomentCatcher {
    config: TrailerConfig,
}

impl MomentCatcher {
    pub fn new(config: TrailerConfig) -> MediaResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrailerConfig {
        &self.config
    }

    /// Probe and analyze a source, producing the excitement curve and plan.
    pub async fn analyze(&self, path: &Path, cancel: Option<&CancelReceiver>) -> MediaResult<AnalysisReport> {
        let started = Instant::now();
        let result = self.analyze_source(path, cancel).await;

        match &result {
            Ok(report) => {
                let elapsed = started.elapsed().as_secs_f64();
                metrics::record_analysis(elapsed, report.curve.len(), report.plan.len());
                info!(
                    path = %path.display(),
                    windows = report.curve.len(),
                    moments = report.plan.len(),
                    trailer_secs = report.plan.total_duration,
                    audio_degraded = report.audio_degraded,
                    elapsed_secs = elapsed,
                    "Analysis complete"
                );
            }
            Err(e) => {
                metrics::record_failure("analysis", e);
                warn!(path = %path.display(), error = %e, "Analysis failed");
            }
        }
        result
    }

    async fn analyze_source(&self, path: &Path, cancel: Option<&CancelReceiver>) -> MediaResult<AnalysisReport> {
        ensure_active(cancel)?;
        let info = probe_video(path).await?;
        info!(
            path = %path.display(),
            duration_secs = info.duration,
            width = info.width,
            height = info.height,
            fps = info.fps,
            has_audio = info.has_audio,
            "Probed source"
        );

        let extracted = extract_signals(path, &info, &self.config, cancel).await?;
        ensure_active(cancel)?;

        let ScoredPlan { curve, plan } = plan_from_signals(&extracted.signals, &self.config)?;

        let mut source = info.source_info();
        source.duration = extracted.signals.duration_secs;
        source.has_audio = extracted.signals.has_audio;

        Ok(AnalysisReport {
            source,
            curve,
            plan,
            audio_degraded: extracted.audio_degraded,
        })
    }

    /// Validate a plan into a cut list under this configuration's trailer cap.
    pub fn cut_list(&self, plan: &TrailerPlan) -> MediaResult<CutList> {
        assemble_cut_list(plan, self.config.max_trailer_duration_s)
    }

    /// Render a plan of `path` to `output`, returning the cuts used.
    pub async fn render(
        &self,
        path: &Path,
        plan: &TrailerPlan,
        output: &Path,
        cancel: Option<&CancelReceiver>,
    ) -> MediaResult<CutList> {
        let cuts = self.cut_list(plan)?;
        let result = render_trailer(path, &cuts, output, cancel).await;
        if let Err(e) = &result {
            metrics::record_failure("render", e);
        }
        result.map(|()| cuts)
    }

    /// Analyze and, if any moment qualified, render the trailer.
    pub async fn generate(
        &self,
        path: &Path,
        output: &Path,
        cancel: Option<&CancelReceiver>,
    ) -> MediaResult<TrailerOutcome> {
        let report = self.analyze(path, cancel).await?;
        if report.plan.is_empty() {
            info!(path = %path.display(), "No qualifying moments, skipping render");
            return Ok(TrailerOutcome { report, cuts: None });
        }

        let cuts = self.render(path, &report.plan, output, cancel).await?;
        Ok(TrailerOutcome {
            report,
            cuts: Some(cuts),
        })
    }
}
