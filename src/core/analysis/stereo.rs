// src/core/analysis/stereo.rs
//
// Stereo field analysis: correlation, side and mid energy, channel balance.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::dsp::amplitude_to_db;
use crate::core::pcm::SampleStream;
use crate::error::Result;

/// Stereo analysis results (zero-filled with `valid = false` unless the input has two channels)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StereoResult {
    pub valid: bool,
    /// Pearson correlation between left and right
    pub correlation: f64,
    /// RMS of L-R
    pub difference_db: f64,
    /// RMS of (L+R)/2
    pub mono_sum_db: f64,
    /// RMS of the two channels' combined power
    pub stereo_rms_db: f64,
    /// Level lost when folding down to mono
    pub cancellation_db: f64,
    pub left_rms_db: f64,
    pub right_rms_db: f64,
    /// left minus right
    pub imbalance_db: f64,
    pub frames: u64,
}

#[derive(Default)]
struct Accumulators {
    sum_l: f64,
    sum_r: f64,
    sum_ll: f64,
    sum_rr: f64,
    sum_lr: f64,
    sum_diff: f64,
    sum_mid: f64,
    sum_power: f64,
    n: u64,
}

impl Accumulators {
    #[inline]
    fn push(&mut self, l: f64, r: f64) {
        self.sum_l += l;
        self.sum_r += r;
        self.sum_ll += l * l;
        self.sum_rr += r * r;
        self.sum_lr += l * r;
        let diff = l - r;
        self.sum_diff += diff * diff;
        let mid = (l + r) * 0.5;
        self.sum_mid += mid * mid;
        self.sum_power += (l * l + r * r) * 0.5;
        self.n += 1;
    }

    fn correlation(&self) -> f64 {
        let n = self.n as f64;
        let num = n * self.sum_lr - self.sum_l * self.sum_r;
        let var_l = n * self.sum_ll - self.sum_l * self.sum_l;
        let var_r = n * self.sum_rr - self.sum_r * self.sum_r;
        let den = (var_l * var_r).sqrt();
        if den > 1e-20 {
            (num / den).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    fn rms_db(&self, sum_sq: f64) -> f64 {
        amplitude_to_db((sum_sq / self.n as f64).sqrt())
    }
}

/// Analyze stereo characteristics
pub fn analyze_stereo<R: Read>(stream: &mut SampleStream<R>) -> Result<StereoResult> {
    let format = *stream.format();
    if format.channels != 2 {
        return Ok(StereoResult::default());
    }
    let scale = format.scale();
    let mut acc = Accumulators::default();

    while let Some(chunk) = stream.next_chunk()? {
        for frame in chunk.chunks_exact(2) {
            acc.push(frame[0] as f64 / scale, frame[1] as f64 / scale);
        }
    }

    if acc.n == 0 {
        return Ok(StereoResult {
            valid: true,
            ..Default::default()
        });
    }

    let mono_sum_db = acc.rms_db(acc.sum_mid);
    let stereo_rms_db = acc.rms_db(acc.sum_power);
    let left_rms_db = acc.rms_db(acc.sum_ll);
    let right_rms_db = acc.rms_db(acc.sum_rr);

    Ok(StereoResult {
        valid: true,
        correlation: acc.correlation(),
        difference_db: acc.rms_db(acc.sum_diff),
        mono_sum_db,
        stereo_rms_db,
        cancellation_db: stereo_rms_db - mono_sum_db,
        left_rms_db,
        right_rms_db,
        imbalance_db: left_rms_db - right_rms_db,
        frames: acc.n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancelToken;
    use crate::core::format::PcmFormat;
    use crate::core::pcm::SampleWidth;
    use std::f64::consts::PI;
    use std::io::Cursor;

    fn stereo(f: impl Fn(usize) -> (f64, f64), frames: usize) -> StereoResult {
        let format = PcmFormat::new(44100, 16, 2).unwrap();
        let mut bytes = Vec::new();
        for i in 0..frames {
            let (l, r) = f(i);
            SampleWidth::I16.encode((l * 32767.0) as i32, &mut bytes);
            SampleWidth::I16.encode((r * 32767.0) as i32, &mut bytes);
        }
        let mut stream = SampleStream::new(Cursor::new(bytes), format, CancelToken::new()).unwrap();
        analyze_stereo(&mut stream).unwrap()
    }

    fn sine(i: usize) -> f64 {
        0.5 * (2.0 * PI * 1000.0 * i as f64 / 44100.0).sin()
    }

    #[test]
    fn test_dual_mono() {
        let r = stereo(|i| (sine(i), sine(i)), 44100);
        assert!(r.correlation > 0.999);
        assert!(r.difference_db < -100.0);
        assert!(r.cancellation_db.abs() < 0.01);
    }

    #[test]
    fn test_inverted_channel() {
        let r = stereo(|i| (sine(i), -sine(i)), 44100);
        assert!(r.correlation < -0.999);
        assert!(r.cancellation_db > 60.0);
    }

    #[test]
    fn test_imbalance() {
        let r = stereo(|i| (sine(i), sine(i) * 0.5), 44100);
        assert!((r.imbalance_db - 6.02).abs() < 0.05);
    }

    #[test]
    fn test_mono_input_is_zero_filled() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        let mut stream =
            SampleStream::new(Cursor::new(vec![0u8; 200]), format, CancelToken::new()).unwrap();
        let r = analyze_stereo(&mut stream).unwrap();
        assert!(!r.valid);
        assert_eq!(r, StereoResult::default());
    }
}
