//! Biquad filtering and the ITU-R BS.1770 K-weighting chain

use std::f64::consts::PI;

/// Direct-form I biquad (a0 normalized to 1)
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// BS.1770 stage 1: high-shelf modelling the acoustic effect of the head
    pub fn k_prefilter(sample_rate: u32) -> Self {
        let f0 = 1681.974_450_955_533;
        let gain_db = 3.999_843_853_973_347;
        let q = 0.707_175_236_955_419_6;

        let k = (PI * f0 / sample_rate as f64).tan();
        let vh = 10.0_f64.powf(gain_db / 20.0);
        let vb = vh.powf(0.499_666_774_154_541_6);
        let a0 = 1.0 + k / q + k * k;

        Self::new(
            [vh + vb * k / q + k * k, 2.0 * (k * k - vh), vh - vb * k / q + k * k],
            [a0, 2.0 * (k * k - 1.0), 1.0 - k / q + k * k],
        )
    }

    /// BS.1770 stage 2: revised low-frequency B-curve high-pass
    pub fn k_rlb(sample_rate: u32) -> Self {
        let f0 = 38.135_470_876_024_44;
        let q = 0.500_327_037_323_877_3;

        let k = (PI * f0 / sample_rate as f64).tan();
        let a0 = 1.0 + k / q + k * k;

        // numerator stays exactly [1, -2, 1] after normalization
        Self::new(
            [a0, -2.0 * a0, a0],
            [a0, 2.0 * (k * k - 1.0), 1.0 - k / q + k * k],
        )
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Two-stage K-weighting filter for one channel
#[derive(Debug, Clone, Copy)]
pub struct KWeighting {
    shelf: Biquad,
    highpass: Biquad,
}

impl KWeighting {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shelf: Biquad::k_prefilter(sample_rate),
            highpass: Biquad::k_rlb(sample_rate),
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        self.highpass.process(self.shelf.process(x))
    }
}
