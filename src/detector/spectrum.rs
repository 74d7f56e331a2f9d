// Spectrum analysis for the activity detector
//
// Computes a Hann-windowed magnitude spectrum and reduces it to the two
// things the detector publishes: a single normalized level (mean of all
// bins) and the leading display-window of bins for visualization.
//
// Bin magnitudes are mapped to [0, 1] over the decibel range [-100, -30],
// the conventional display range of a spectrum analyser; digital silence
// maps to exactly 0.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Bottom of the analyser display range in dBFS
const MIN_DB: f32 = -100.0;
/// Top of the analyser display range in dBFS
const MAX_DB: f32 = -30.0;

/// One analyzed frame: overall level plus the display window of bins
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    /// Mean of all normalized magnitude bins, in [0, 1]
    pub level: f32,
    /// First `display_bins` bins of the spectrum, each in [0, 1]
    pub bins: Vec<f32>,
}

/// FFT-based spectrum analyzer with pre-allocated buffers
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    display_bins: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for the given FFT size and display window
    ///
    /// `display_bins` is clamped to the number of available spectrum bins
    /// (`fft_size / 2`).
    pub fn new(fft_size: usize, display_bins: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Pre-compute Hann window to reduce spectral leakage
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            fft,
            fft_size,
            display_bins: display_bins.min(fft_size / 2),
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; fft_size / 2],
        }
    }

    /// Analyze the most recent window of samples
    ///
    /// Uses the trailing `fft_size` samples, zero-padding when fewer are
    /// available.
    pub fn analyze(&mut self, samples: &[f32]) -> SpectrumFrame {
        let start = samples.len().saturating_sub(self.fft_size);
        let window_samples = &samples[start..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = window_samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        // Hann window has a coherent gain of 0.5, hence the factor 4/N for
        // a full-scale sine to estimate amplitude 1.0 in its bin.
        let scale = 4.0 / self.fft_size as f32;
        for (mag, bin) in self.magnitudes.iter_mut().zip(self.buffer.iter()) {
            *mag = normalize_db(bin.norm() * scale);
        }

        let level = if self.magnitudes.is_empty() {
            0.0
        } else {
            self.magnitudes.iter().sum::<f32>() / self.magnitudes.len() as f32
        };

        SpectrumFrame {
            level,
            bins: self.magnitudes[..self.display_bins].to_vec(),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn display_bins(&self) -> usize {
        self.display_bins
    }
}

/// Map a linear amplitude estimate onto [0, 1] over the analyser dB range
fn normalize_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * amplitude.log10();
    ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0)
}
