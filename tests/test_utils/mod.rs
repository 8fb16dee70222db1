// tests/test_utils/mod.rs
//
// Shared helpers for the integration tests: deterministic signal
// generators, PCM encoders and in-memory sources.

#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::PathBuf;

use pcmaudit::core::SampleWidth;
use pcmaudit::{AnalysisResult, AudioAnalyzer, Checks, MemorySource, PcmFormat};
use uuid::Uuid;

/// Path of the built CLI binary
pub fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pcmaudit"))
}

/// Unique file name in the system temp dir
pub fn temp_path(extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pcmaudit-{}.{}", Uuid::new_v4(), extension))
}

/// Linear congruential generator; reproducible across platforms
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Uniform in [-1, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

pub fn sine(freq: f64, rate: f64, len: usize, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / rate).sin())
        .collect()
}

pub fn white_noise(len: usize, seed: u64, amplitude: f64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..len).map(|_| amplitude * rng.next_f64()).collect()
}

/// Pink noise (Paul Kellet's filter) scaled to the given peak
pub fn pink_noise(len: usize, seed: u64, peak: f64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    let mut b = [0.0f64; 7];
    let raw: Vec<f64> = (0..len)
        .map(|_| {
            let white = rng.next_f64();
            b[0] = 0.99886 * b[0] + white * 0.0555179;
            b[1] = 0.99332 * b[1] + white * 0.0750759;
            b[2] = 0.96900 * b[2] + white * 0.1538520;
            b[3] = 0.86650 * b[3] + white * 0.3104856;
            b[4] = 0.55000 * b[4] + white * 0.5329522;
            b[5] = -0.7616 * b[5] - white * 0.0168980;
            let out = b.iter().sum::<f64>() + white * 0.5362;
            b[6] = white * 0.115926;
            out
        })
        .collect();
    normalize(raw, peak)
}

/// Scale so the largest magnitude equals `peak`
pub fn normalize(signal: Vec<f64>, peak: f64) -> Vec<f64> {
    let max = signal.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    if max == 0.0 {
        return signal;
    }
    signal.into_iter().map(|x| x * peak / max).collect()
}

/// Windowed-sinc (Blackman) lowpass
pub fn lowpass(signal: &[f64], cutoff_hz: f64, rate: f64, taps: usize) -> Vec<f64> {
    let fc = cutoff_hz / rate;
    let m = (taps - 1) as f64;
    let kernel: Vec<f64> = (0..taps)
        .map(|n| {
            let x = n as f64 - m / 2.0;
            let sinc = if x == 0.0 {
                2.0 * fc
            } else {
                (2.0 * PI * fc * x).sin() / (PI * x)
            };
            let w = 0.42 - 0.5 * (2.0 * PI * n as f64 / m).cos() + 0.08 * (4.0 * PI * n as f64 / m).cos();
            sinc * w
        })
        .collect();

    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(taps - 1);
            (start..=i).map(|j| kernel[i - j] * signal[j]).sum()
        })
        .collect()
}

/// Interleave equally long channels into frames
pub fn interleave(channels: &[Vec<f64>]) -> Vec<f64> {
    let len = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len * channels.len());
    for i in 0..len {
        for ch in channels {
            out.push(ch[i]);
        }
    }
    out
}

/// Quantize [-1, 1] floats to little-endian PCM
pub fn encode(samples: &[f64], bit_depth: u32) -> Vec<u8> {
    let max = ((1i64 << (bit_depth - 1)) - 1) as f64;
    let ints: Vec<i32> = samples
        .iter()
        .map(|&x| (x * max).round().clamp(-max - 1.0, max) as i32)
        .collect();
    encode_ints(&ints, bit_depth)
}

pub fn encode_ints(samples: &[i32], bit_depth: u32) -> Vec<u8> {
    let width = SampleWidth::from_bits(bit_depth).expect("supported bit depth");
    let mut bytes = Vec::with_capacity(samples.len() * width.bytes());
    for &s in samples {
        width.encode(s, &mut bytes);
    }
    bytes
}

pub fn format(sample_rate: u32, bit_depth: u32, channels: usize) -> PcmFormat {
    PcmFormat::new(sample_rate, bit_depth, channels).expect("valid format")
}

/// Run the selected checks over PCM bytes held in memory
pub fn analyze(bytes: Vec<u8>, format: PcmFormat, checks: &str) -> AnalysisResult {
    let checks: Checks = checks.parse().expect("valid check list");
    AudioAnalyzer::builder()
        .checks(checks)
        .build()
        .analyze(&MemorySource::new(bytes), format)
        .expect("analysis succeeds")
}
