//! Real FFT processing with windowing

use std::sync::{Arc, Mutex, OnceLock};

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use super::windows::{create_window, WindowType};
use crate::error::{AnalysisError, Result};

/// Process-wide planner; plans are immutable once built and shared across threads
fn shared_plan(fft_size: usize) -> Arc<dyn RealToComplex<f64>> {
    static PLANNER: OnceLock<Mutex<RealFftPlanner<f64>>> = OnceLock::new();
    let planner = PLANNER.get_or_init(|| Mutex::new(RealFftPlanner::new()));
    let mut guard = planner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.plan_fft_forward(fft_size)
}

/// FFT computation with windowing
pub struct FftProcessor {
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    fft_size: usize,
}

impl FftProcessor {
    pub fn new(fft_size: usize, window_type: WindowType) -> Self {
        let fft = shared_plan(fft_size);
        let output = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        Self {
            fft,
            window: create_window(fft_size, window_type),
            input: vec![0.0; fft_size],
            output,
            scratch,
            fft_size,
        }
    }

    /// Compute the magnitude spectrum (`fft_size / 2 + 1` bins) into `out`.
    /// Input shorter than the FFT size is zero-padded.
    pub fn magnitude_spectrum_into(&mut self, samples: &[f64], out: &mut Vec<f64>) -> Result<()> {
        let n = samples.len().min(self.fft_size);
        for (dst, (&s, &w)) in self.input.iter_mut().zip(samples[..n].iter().zip(&self.window)) {
            *dst = s * w;
        }
        self.input[n..].fill(0.0);

        self.fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| AnalysisError::InvalidConfig(format!("FFT failed: {}", e)))?;

        out.clear();
        out.extend(self.output.iter().map(|c| c.norm()));
        Ok(())
    }

    /// Compute magnitude spectrum
    pub fn magnitude_spectrum(&mut self, samples: &[f64]) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.fft_size / 2 + 1);
        self.magnitude_spectrum_into(samples, &mut out)?;
        Ok(out)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let mut fft = FftProcessor::new(1024, WindowType::Hann);
        // 64 cycles over 1024 samples lands exactly on bin 64
        let samples: Vec<f64> = (0..1024)
            .map(|i| (2.0 * PI * 64.0 * i as f64 / 1024.0).sin())
            .collect();
        let spectrum = fft.magnitude_spectrum(&samples).unwrap();
        assert_eq!(spectrum.len(), 513);
        let peak = spectrum
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        assert_eq!(peak.0, 64);
    }
}
