// src/core/analysis/true_peak.rs
//
// True peak measurement per ITU-R BS.1770: 4x polyphase oversampling with
// inter-sample peak (ISP) counting, a small overshoot histogram and ISP
// density per second.

use std::f64::consts::PI;
use std::io::Read;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::core::dsp::{amplitude_to_db, create_window, WindowType};
use crate::core::pcm::SampleStream;
use crate::error::Result;

const OVERSAMPLE: usize = 4;
const TAPS_PER_PHASE: usize = 12;
const KAISER_BETA: f64 = 5.0;

/// Interpolated magnitudes within this much of full scale are rounding noise
const ISP_EPSILON: f64 = 1e-9;

type PhaseTable = [[f64; TAPS_PER_PHASE]; OVERSAMPLE];

/// Polyphase table, built once and shared read-only
fn coefficients() -> &'static PhaseTable {
    static TABLE: OnceLock<PhaseTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let total = OVERSAMPLE * TAPS_PER_PHASE;
        let window = create_window(total, WindowType::Kaiser(KAISER_BETA));
        let center = (total - 1) as f64 / 2.0;

        let prototype: Vec<f64> = (0..total)
            .map(|n| {
                let x = (n as f64 - center) / OVERSAMPLE as f64;
                let sinc = if x.abs() < 1e-12 { 1.0 } else { (PI * x).sin() / (PI * x) };
                sinc * window[n] * OVERSAMPLE as f64
            })
            .collect();

        let mut table = [[0.0; TAPS_PER_PHASE]; OVERSAMPLE];
        for (phase, row) in table.iter_mut().enumerate() {
            for (k, tap) in row.iter_mut().enumerate() {
                *tap = prototype[phase + OVERSAMPLE * k];
            }
            let sum: f64 = row.iter().sum();
            if sum.abs() > 1e-12 {
                row.iter_mut().for_each(|t| *t /= sum);
            }
        }
        table
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruePeakResult {
    pub sample_peak_db: f64,
    pub true_peak_db: f64,
    pub isp_count: u64,
    /// Largest ISP level, 0 when there were none
    pub isp_max_db: f64,
    pub isps_above_half_db: u64,
    pub isps_above_1db: u64,
    pub isps_above_2db: u64,
    /// Most ISPs in any one-second window
    pub isp_density_peak: u64,
    pub worst_density_sec: f64,
    /// ISPs per second over the whole stream
    pub isp_density_avg: f64,
    pub duration_sec: f64,
}

/// Per-channel oversampler state; `history[0]` is the newest sample
struct Oversampler {
    history: [f64; TAPS_PER_PHASE],
}

impl Oversampler {
    fn new() -> Self {
        Self {
            history: [0.0; TAPS_PER_PHASE],
        }
    }

    #[inline]
    fn push(&mut self, x: f64, table: &PhaseTable) -> [f64; OVERSAMPLE] {
        self.history.copy_within(0..TAPS_PER_PHASE - 1, 1);
        self.history[0] = x;
        let mut out = [0.0; OVERSAMPLE];
        for (y, row) in out.iter_mut().zip(table) {
            *y = row.iter().zip(&self.history).map(|(c, h)| c * h).sum();
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct TruePeakAnalyzer;

impl TruePeakAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze<R: Read>(&self, stream: &mut SampleStream<R>) -> Result<TruePeakResult> {
        let format = *stream.format();
        let channels = format.channels;
        let scale = format.scale();
        let rate = format.sample_rate as u64;
        let table = coefficients();

        let mut oversamplers: Vec<Oversampler> = (0..channels).map(|_| Oversampler::new()).collect();
        let mut sample_peak = 0.0f64;
        let mut interp_peak = 0.0f64;
        let mut result = TruePeakResult::default();

        let mut isp_max = 0.0f64;
        let mut second = 0u64;
        let mut second_count = 0u64;
        let mut frame_index = 0u64;

        while let Some(chunk) = stream.next_chunk()? {
            for frame in chunk.chunks_exact(channels) {
                let this_second = frame_index / rate;
                if this_second != second {
                    if second_count > result.isp_density_peak {
                        result.isp_density_peak = second_count;
                        result.worst_density_sec = second as f64;
                    }
                    second = this_second;
                    second_count = 0;
                }

                for (&raw, os) in frame.iter().zip(oversamplers.iter_mut()) {
                    let x = raw as f64 / scale;
                    sample_peak = sample_peak.max(x.abs());

                    for y in os.push(x, table) {
                        let level = y.abs();
                        interp_peak = interp_peak.max(level);
                        if level > 1.0 + ISP_EPSILON {
                            let over_db = 20.0 * level.log10();
                            result.isp_count += 1;
                            second_count += 1;
                            isp_max = isp_max.max(level);
                            if over_db > 0.5 {
                                result.isps_above_half_db += 1;
                            }
                            if over_db > 1.0 {
                                result.isps_above_1db += 1;
                            }
                            if over_db > 2.0 {
                                result.isps_above_2db += 1;
                            }
                        }
                    }
                }
                frame_index += 1;
            }
        }

        if second_count > result.isp_density_peak {
            result.isp_density_peak = second_count;
            result.worst_density_sec = second as f64;
        }

        result.duration_sec = frame_index as f64 / rate as f64;
        result.sample_peak_db = amplitude_to_db(sample_peak);
        result.true_peak_db = amplitude_to_db(sample_peak.max(interp_peak));
        result.isp_max_db = if result.isp_count > 0 { 20.0 * isp_max.log10() } else { 0.0 };
        result.isp_density_avg = if result.duration_sec > 0.0 {
            result.isp_count as f64 / result.duration_sec
        } else {
            0.0
        };

        log::debug!(
            "true peak: {:.2} dBTP (sample {:.2} dBFS), {} ISPs",
            result.true_peak_db,
            result.sample_peak_db,
            result.isp_count
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancelToken;
    use crate::core::format::PcmFormat;
    use crate::core::pcm::SampleWidth;
    use std::io::Cursor;

    fn run(format: PcmFormat, frames: usize, f: impl Fn(usize) -> f64) -> TruePeakResult {
        let mut bytes = Vec::new();
        for i in 0..frames {
            for _ in 0..format.channels {
                SampleWidth::I16.encode((f(i) * 32767.0).round() as i32, &mut bytes);
            }
        }
        let mut stream = SampleStream::new(Cursor::new(bytes), format, CancelToken::new()).unwrap();
        TruePeakAnalyzer::new().analyze(&mut stream).unwrap()
    }

    /// fs/4 sine sampled 45 degrees off its peaks
    fn quarter_rate(amp: f64) -> impl Fn(usize) -> f64 {
        move |i| amp * (PI / 2.0 * i as f64 + PI / 4.0).sin()
    }

    #[test]
    fn test_phase_rows_sum_to_one() {
        for row in coefficients() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_finds_peak_between_samples() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        let r = run(format, 44100, quarter_rate(0.9));
        assert!((r.sample_peak_db + 3.93).abs() < 0.05);
        assert!(r.true_peak_db > r.sample_peak_db + 2.0);
        assert!((r.true_peak_db + 0.92).abs() < 0.5, "got {}", r.true_peak_db);
        assert_eq!(r.isp_count, 0);
        assert_eq!(r.isp_max_db, 0.0);
    }

    #[test]
    fn test_overs_are_counted() {
        let format = PcmFormat::new(44100, 16, 2).unwrap();
        let r = run(format, 44100 * 2, quarter_rate(1.2));
        assert!(r.isp_count > 0);
        assert!(r.isp_count >= r.isps_above_half_db);
        assert!(r.isps_above_half_db >= r.isps_above_1db);
        assert!(r.isps_above_1db >= r.isps_above_2db);
        assert!(r.isp_max_db > 0.0);
        assert!(r.isp_density_peak > 0);
        assert!((r.duration_sec - 2.0).abs() < 1e-9);
        assert!((r.isp_density_avg - r.isp_count as f64 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_silence() {
        let format = PcmFormat::new(48000, 16, 1).unwrap();
        let r = run(format, 4800, |_| 0.0);
        assert_eq!(r.true_peak_db, -120.0);
        assert_eq!(r.sample_peak_db, -120.0);
        assert_eq!(r.isp_count, 0);
    }

    #[test]
    fn test_true_peak_not_below_sample_peak() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        let r = run(format, 1000, |i| if i % 7 == 0 { 0.95 } else { -0.2 });
        assert!(r.true_peak_db >= r.sample_peak_db);
    }
}
