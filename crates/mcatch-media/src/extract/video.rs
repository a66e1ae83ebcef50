//! Per-frame visual features from downscaled RGB frames.
//!
//! Frames are decoded at the analysis rate straight into `rgb24` at a fixed
//! small resolution, then reduced to motion, edge density, brightness
//! variance and color variance.

use std::io::ErrorKind;
use std::path::Path;

use ndarray::{s, Array2};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use mcatch_models::{RawSignal, SignalKind, TrailerConfig};

use crate::cancel::{ensure_active, CancelReceiver};
use crate::command::PipedDecoder;
use crate::error::{MediaError, MediaResult, Stage};
use crate::probe::VideoInfo;

/// Visual features of one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameFeatures {
    /// Mean absolute luma difference against the previous frame (0 for the first)
    pub motion: f64,
    /// Fraction of interior pixels whose Sobel magnitude exceeds the threshold
    pub edge_density: f64,
    /// Variance of BT.601 luma
    pub brightness_variance: f64,
    /// Mean of the Cb and Cr variances
    pub color_variance: f64,
}

/// Stateful analyzer; holds the previous frame's luma for motion.
pub struct FrameAnalyzer {
    width: usize,
    height: usize,
    edge_threshold: f64,
    prev_luma: Option<Array2<f32>>,
}

impl FrameAnalyzer {
    pub fn new(width: u32, height: u32, edge_threshold: f64) -> Self {
        Self {
            width: width as usize,
            height: height as usize,
            edge_threshold,
            prev_luma: None,
        }
    }

    /// Size of one packed `rgb24` frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.width * self.height * 3
    }

    /// Analyze one packed `rgb24` frame.
    pub fn analyze(&mut self, rgb: &[u8]) -> MediaResult<FrameFeatures> {
        if rgb.len() != self.frame_bytes() {
            return Err(MediaError::internal(
                Stage::VideoExtraction,
                None,
                format!("frame has {} bytes, expected {}", rgb.len(), self.frame_bytes()),
            ));
        }

        let shape = (self.height, self.width);
        let mut luma = Array2::<f32>::zeros(shape);
        let mut cb = Array2::<f32>::zeros(shape);
        let mut cr = Array2::<f32>::zeros(shape);

        for (i, px) in rgb.chunks_exact(3).enumerate() {
            let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
            let idx = (i / self.width, i % self.width);
            luma[idx] = 0.299 * r + 0.587 * g + 0.114 * b;
            cb[idx] = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
            cr[idx] = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
        }

        let motion = match &self.prev_luma {
            Some(prev) => f64::from((&luma - prev).mapv(f32::abs).mean().unwrap_or(0.0)),
            None => 0.0,
        };

        let features = FrameFeatures {
            motion,
            edge_density: edge_density(&luma, self.edge_threshold),
            brightness_variance: variance(&luma),
            color_variance: (variance(&cb) + variance(&cr)) / 2.0,
        };

        self.prev_luma = Some(luma);
        Ok(features)
    }
}

/// Population variance; 0 for an empty plane.
fn variance(plane: &Array2<f32>) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    let n = plane.len() as f64;
    let mean = plane.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    plane
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// Fraction of interior pixels with a 3x3 Sobel gradient magnitude above `threshold`.
fn edge_density(luma: &Array2<f32>, threshold: f64) -> f64 {
    let (h, w) = luma.dim();
    if h < 3 || w < 3 {
        return 0.0;
    }

    let threshold_sq = (threshold * threshold) as f32;
    let mut edges = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let n = luma.slice(s![y - 1..=y + 1, x - 1..=x + 1]);
            let gx = (n[[0, 2]] + 2.0 * n[[1, 2]] + n[[2, 2]]) - (n[[0, 0]] + 2.0 * n[[1, 0]] + n[[2, 0]]);
            let gy = (n[[2, 0]] + 2.0 * n[[2, 1]] + n[[2, 2]]) - (n[[0, 0]] + 2.0 * n[[0, 1]] + n[[0, 2]]);
            if gx * gx + gy * gy > threshold_sq {
                edges += 1;
            }
        }
    }
    edges as f64 / ((h - 2) * (w - 2)) as f64
}

/// Rate at which frames are sampled: the configured rate, capped at the source fps.
pub fn sampling_fps(config: &TrailerConfig, info: &VideoInfo) -> f64 {
    if info.fps.is_finite() && info.fps > 0.0 {
        config.analysis_fps.min(info.fps)
    } else {
        config.analysis_fps
    }
}

/// Decode sampled frames and compute the four visual signals.
///
/// Fails with [`MediaError::SourceUnreadable`] when no frame can be decoded.
pub async fn extract_video_signals(
    path: &Path,
    info: &VideoInfo,
    config: &TrailerConfig,
    cancel: Option<&CancelReceiver>,
) -> MediaResult<[RawSignal; 4]> {
    let fps = sampling_fps(config, info);
    let args: Vec<String> = vec![
        "-an".into(),
        "-vf".into(),
        format!("fps={:.6},scale={}:{}", fps, config.frame_width, config.frame_height),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-f".into(),
        "rawvideo".into(),
    ];

    let mut decoder = PipedDecoder::spawn(path, &args, Stage::VideoExtraction)?;
    let mut analyzer = FrameAnalyzer::new(config.frame_width, config.frame_height, config.edge_threshold);
    let mut frame = vec![0u8; analyzer.frame_bytes()];

    let mut motion = Vec::new();
    let mut edges = Vec::new();
    let mut brightness = Vec::new();
    let mut color = Vec::new();

    loop {
        if let Err(e) = ensure_active(cancel) {
            decoder.abort().await;
            return Err(e);
        }

        match decoder.stdout().read_exact(&mut frame).await {
            Ok(_) => {}
            // A truncated trailing frame is dropped.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let features = analyzer.analyze(&frame)?;
        motion.push(features.motion);
        edges.push(features.edge_density);
        brightness.push(features.brightness_variance);
        color.push(features.color_variance);
    }

    let exit = decoder.finish().await?;
    if motion.is_empty() {
        let reason = if exit.stderr.is_empty() {
            "no video frames could be decoded".to_string()
        } else {
            exit.stderr
        };
        return Err(MediaError::source_unreadable(path, reason));
    }
    if !exit.success {
        warn!(
            exit_code = ?exit.code,
            stderr = %exit.stderr,
            frames = motion.len(),
            "Video decoder exited with error, using frames decoded so far"
        );
    }

    debug!(frames = motion.len(), fps, "Visual features extracted");

    Ok([
        RawSignal::new(SignalKind::Motion, fps, motion),
        RawSignal::new(SignalKind::EdgeDensity, fps, edges),
        RawSignal::new(SignalKind::BrightnessVariance, fps, brightness),
        RawSignal::new(SignalKind::ColorVariance, fps, color),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
        rgb.iter().copied().cycle().take(width * height * 3).collect()
    }

    #[test]
    fn test_solid_frame_has_no_variance_or_edges() {
        let mut analyzer = FrameAnalyzer::new(16, 9, 100.0);
        let f = analyzer.analyze(&solid(16, 9, [40, 80, 120])).unwrap();
        assert_eq!(f.motion, 0.0);
        assert_eq!(f.edge_density, 0.0);
        assert!(f.brightness_variance < 1e-6);
        assert!(f.color_variance < 1e-6);
    }

    #[test]
    fn test_motion_between_frames() {
        let mut analyzer = FrameAnalyzer::new(8, 8, 100.0);
        analyzer.analyze(&solid(8, 8, [0, 0, 0])).unwrap();
        let f = analyzer.analyze(&solid(8, 8, [100, 100, 100])).unwrap();
        // Gray luma equals the channel value.
        assert!((f.motion - 100.0).abs() < 1e-3);

        let f = analyzer.analyze(&solid(8, 8, [100, 100, 100])).unwrap();
        assert!(f.motion < 1e-6);
    }

    #[test]
    fn test_vertical_edge_is_detected() {
        let (w, h) = (10, 6);
        let mut rgb = Vec::with_capacity(w * h * 3);
        for _ in 0..h {
            for x in 0..w {
                let v = if x < w / 2 { 0 } else { 255 };
                rgb.extend_from_slice(&[v, v, v]);
            }
        }

        let mut analyzer = FrameAnalyzer::new(w as u32, h as u32, 100.0);
        let f = analyzer.analyze(&rgb).unwrap();
        // Columns 4 and 5 straddle the step on each of the 4 interior rows.
        let expected = (2 * (h - 2)) as f64 / ((h - 2) * (w - 2)) as f64;
        assert!((f.edge_density - expected).abs() < 1e-9);
        assert!(f.brightness_variance > 1000.0);
    }

    #[test]
    fn test_colorful_frame_has_chroma_variance() {
        let (w, h) = (4, 4);
        let mut rgb = Vec::new();
        for i in 0..w * h {
            let px: [u8; 3] = if i % 2 == 0 { [255, 0, 0] } else { [0, 0, 255] };
            rgb.extend_from_slice(&px);
        }
        let mut analyzer = FrameAnalyzer::new(w as u32, h as u32, 100.0);
        let f = analyzer.analyze(&rgb).unwrap();
        assert!(f.color_variance > 1000.0);
    }

    #[test]
    fn test_wrong_frame_size_is_internal_error() {
        let mut analyzer = FrameAnalyzer::new(4, 4, 100.0);
        let err = analyzer.analyze(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            MediaError::Internal {
                stage: Stage::VideoExtraction,
                ..
            }
        ));
    }

    #[test]
    fn test_sampling_fps_is_capped() {
        let config = TrailerConfig::default();
        let mut info = VideoInfo {
            duration: 10.0,
            width: 640,
            height: 360,
            fps: 2.0,
            codec: "h264".into(),
            has_audio: true,
            audio_sample_rate: Some(44100),
        };
        assert!((sampling_fps(&config, &info) - 2.0).abs() < 1e-9);
        info.fps = 30.0;
        assert!((sampling_fps(&config, &info) - 4.0).abs() < 1e-9);
    }
}
