//! Command-line trailer generator.
//!
//! Analyzes one video, prints the selected cut list and optionally renders the
//! trailer and writes the full analysis report as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use mcatch_api::{init_tracing, RunLogger};
use mcatch_media::{cancel_channel, MomentCatcher};
use mcatch_models::{format_timestamp, TrailerConfig};

#[derive(Parser)]
#[command(name = "mcatch-analyze")]
#[command(about = "Find the most exciting moments of a video and cut a trailer", long_about = None)]
#[command(version)]
struct Cli {
    /// Input video path
    input: PathBuf,

    /// Render the trailer to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the analysis report (curve and plan) as JSON to this path
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Maximum number of moments
    #[arg(short = 'n', long)]
    num_moments: Option<usize>,

    /// Length of each moment in seconds
    #[arg(short = 'd', long)]
    moment_duration: Option<f64>,

    /// Maximum trailer length in seconds
    #[arg(short = 'm', long)]
    max_duration: Option<f64>,
}

impl Cli {
    /// Environment-derived config with command-line overrides applied.
    fn trailer_config(&self) -> TrailerConfig {
        let mut config = TrailerConfig::from_env();
        if let Some(n) = self.num_moments {
            config = config.with_num_moments(n);
        }
        if let Some(secs) = self.moment_duration {
            config = config.with_moment_duration(secs);
        }
        if let Some(secs) = self.max_duration {
            config = config.with_max_trailer_duration(secs);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("warn")?;

    let cli = Cli::parse();
    let catcher = MomentCatcher::new(cli.trailer_config())?;
    let logger = RunLogger::new("cli");

    let (cancel_tx, cancel_rx) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel_tx.send_replace(true);
        }
    });

    logger.log_start(&cli.input.display().to_string());
    let report = catcher
        .analyze(&cli.input, Some(&cancel_rx))
        .await
        .with_context(|| format!("failed to analyze {}", cli.input.display()))?;

    if report.audio_degraded {
        logger.log_warning("no usable audio, scored on visual features only");
    }

    println!(
        "{}: {} windows (peak score {:.3}), {} moments, {:.1}s trailer",
        cli.input.display(),
        report.curve.len(),
        report.peak_score().unwrap_or_default(),
        report.plan.len(),
        report.plan.total_duration
    );
    for moment in &report.plan.moments {
        println!(
            "  {} -> {}  score {:.3}",
            format_timestamp(moment.start),
            format_timestamp(moment.end),
            moment.score
        );
    }

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    if let Some(output) = &cli.output {
        if report.plan.is_empty() {
            println!("No qualifying moments, nothing rendered");
        } else {
            let cuts = catcher
                .render(&cli.input, &report.plan, output, Some(&cancel_rx))
                .await
                .with_context(|| format!("failed to render {}", output.display()))?;
            println!("Wrote {} ({} cuts, {:.1}s)", output.display(), cuts.len(), cuts.total_duration);
        }
    }

    logger.log_completion(&format!("{} moments", report.plan.len()));
    Ok(())
}
