//! Pipeline tests against real media generated with FFmpeg's lavfi sources.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use mcatch_media::{probe_video, MediaError, MomentCatcher};
use mcatch_models::{Moment, TrailerConfig, TrailerPlan};
use tokio::process::Command;

async fn generate(dir: &Path, name: &str, inputs: &[&str], extra: &[&str]) -> PathBuf {
    let output = dir.join(name);
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-hide_banner", "-v", "error"]);
    for input in inputs {
        cmd.args(["-f", "lavfi", "-i", input]);
    }
    let status = cmd
        .args(extra)
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(&output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .unwrap();
    assert!(status.success(), "failed to generate {name}");
    output
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_analyze_clip_with_audio() {
    let dir = tempfile::tempdir().unwrap();
    let clip = generate(
        dir.path(),
        "testsrc.mp4",
        &["testsrc=duration=12:size=320x180:rate=25", "sine=frequency=440:duration=12"],
        &["-c:a", "aac", "-shortest"],
    )
    .await;

    let catcher = MomentCatcher::new(TrailerConfig::default()).unwrap();
    let report = catcher.analyze(&clip, None).await.unwrap();

    assert!((report.source.duration - 12.0).abs() < 0.5);
    assert!(report.source.has_audio);
    assert!(!report.audio_degraded);
    assert!(!report.curve.is_empty());
    assert!(report.plan.total_duration <= 30.0);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_missing_audio_degrades_to_visual() {
    let dir = tempfile::tempdir().unwrap();
    let clip = generate(
        dir.path(),
        "video_only.mp4",
        &["testsrc=duration=8:size=320x180:rate=25"],
        &["-an"],
    )
    .await;

    let catcher = MomentCatcher::new(TrailerConfig::default()).unwrap();
    let report = catcher.analyze(&clip, None).await.unwrap();

    assert!(report.audio_degraded);
    assert!(!report.source.has_audio);
    assert!(!report.curve.is_empty());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_static_silent_clip_has_no_moments() {
    let dir = tempfile::tempdir().unwrap();
    let clip = generate(
        dir.path(),
        "gray.mp4",
        &["color=c=gray:size=320x180:rate=25:duration=10", "anullsrc=r=44100:cl=mono"],
        &["-c:a", "aac", "-t", "10"],
    )
    .await;

    let catcher = MomentCatcher::new(TrailerConfig::default()).unwrap();
    let outcome = catcher.generate(&clip, &dir.path().join("trailer.mp4"), None).await.unwrap();

    assert!(outcome.report.plan.is_empty());
    assert!(outcome.cuts.is_none());
    assert!(!dir.path().join("trailer.mp4").exists());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_render_plan() {
    let dir = tempfile::tempdir().unwrap();
    let clip = generate(
        dir.path(),
        "source.mp4",
        &["testsrc=duration=12:size=320x180:rate=25", "sine=frequency=220:duration=12"],
        &["-c:a", "aac", "-shortest"],
    )
    .await;

    let plan = TrailerPlan::from_moments(
        vec![Moment::new(1.0, 3.0, 0.9), Moment::new(6.0, 8.0, 0.7)],
        12.0,
    );
    let output = dir.path().join("out").join("trailer.mp4");

    let catcher = MomentCatcher::new(TrailerConfig::default()).unwrap();
    let cuts = catcher.render(&clip, &plan, &output, None).await.unwrap();
    assert_eq!(cuts.len(), 2);

    let info = probe_video(&output).await.unwrap();
    assert!((info.duration - 4.0).abs() < 0.5, "rendered {}s", info.duration);
}

#[tokio::test]
#[ignore = "requires ffprobe"]
async fn test_garbage_file_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.mp4");
    tokio::fs::write(&path, b"definitely not a video").await.unwrap();

    let catcher = MomentCatcher::new(TrailerConfig::default()).unwrap();
    let err = catcher.analyze(&path, None).await.unwrap_err();
    assert!(matches!(err, MediaError::SourceUnreadable { .. }));
}
