//! Spectral centroid of Hann-windowed audio frames.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Reusable spectral centroid calculator for frames of a fixed length.
///
/// Frames are Hann-windowed and zero-padded to the next power of two. The
/// centroid is the magnitude-weighted mean frequency over bins `0..=N/2`.
pub struct SpectralCentroid {
    fft: Arc<dyn Fft<f32>>,
    fft_len: usize,
    window: Vec<f32>,
    bin_hz: f64,
    buffer: Vec<Complex<f32>>,
}

impl SpectralCentroid {
    pub fn new(frame_len: usize, sample_rate: u32) -> Self {
        let fft_len = frame_len.max(2).next_power_of_two();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_len);
        Self {
            fft,
            fft_len,
            window: hann_window(frame_len),
            bin_hz: f64::from(sample_rate) / fft_len as f64,
            buffer: vec![Complex::new(0.0, 0.0); fft_len],
        }
    }

    /// Centroid in Hz, 0 for a silent frame.
    pub fn compute(&mut self, frame: &[f32]) -> f64 {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = match (frame.get(i), self.window.get(i)) {
                (Some(s), Some(w)) => s * w,
                _ => 0.0,
            };
            *slot = Complex::new(sample, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for (k, bin) in self.buffer[..=self.fft_len / 2].iter().enumerate() {
            let magnitude = f64::from(bin.norm());
            weighted += k as f64 * self.bin_hz * magnitude;
            total += magnitude;
        }

        if total <= 1e-12 {
            0.0
        } else {
            weighted / total
        }
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f32;
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
        .collect()
}
