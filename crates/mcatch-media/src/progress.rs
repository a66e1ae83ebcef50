//! Parsing of FFmpeg's `-progress pipe:2` key/value stream.

use serde::{Deserialize, Serialize};

/// Progress snapshot of a running FFmpeg encode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    /// Set once FFmpeg reports `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fold one `key=value` line into the snapshot.
    ///
    /// Returns true when the line closes a progress block, which is the point
    /// at which FFmpeg has emitted a consistent set of keys.
    pub fn apply_line(&mut self, line: &str) -> bool {
        let Some((key, value)) = line.trim().split_once('=') else {
            return false;
        };

        match key {
            // Both keys carry microseconds despite the name of the first.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.frame = frame;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                self.is_complete = value == "end";
                return true;
            }
            _ => {}
        }
        false
    }

    /// Progress as a percentage of `total_ms`, capped at 100.
    pub fn percentage(&self, total_ms: i64) -> f64 {
        if total_ms <= 0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Seconds until `total_ms` of output is written at the current speed.
    pub fn eta_seconds(&self, total_ms: i64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        let remaining_ms = (total_ms - self.out_time_ms).max(0);
        Some(remaining_ms as f64 / 1000.0 / self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut progress = FfmpegProgress::default();

        assert!(!progress.apply_line("frame=42"));
        assert!(!progress.apply_line("out_time_us=1500000"));
        assert!(!progress.apply_line("speed=2.0x"));
        assert!(!progress.apply_line("speed=N/A"));
        assert!(progress.apply_line("progress=continue"));

        assert_eq!(progress.frame, 42);
        assert_eq!(progress.out_time_ms, 1500);
        assert!((progress.speed - 2.0).abs() < 1e-9);
        assert!(!progress.is_complete);

        assert!(progress.apply_line("progress=end"));
        assert!(progress.is_complete);
    }

    #[test]
    fn test_percentage_and_eta() {
        let progress = FfmpegProgress {
            out_time_ms: 3000,
            speed: 2.0,
            ..Default::default()
        };

        assert!((progress.percentage(12000) - 25.0).abs() < 1e-9);
        assert_eq!(progress.percentage(0), 0.0);
        // 9 s of output left at 2x realtime
        assert!((progress.eta_seconds(12000).unwrap() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_ignores_noise() {
        let mut progress = FfmpegProgress::default();
        assert!(!progress.apply_line("[mp4 @ 0x55] some warning"));
        assert!(!progress.apply_line("frame=abc"));
        assert_eq!(progress, FfmpegProgress::default());
    }
}
