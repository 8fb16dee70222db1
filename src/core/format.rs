// src/core/format.rs
//
// PCM stream description shared by every analyzer.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Description of a raw, signed, little-endian, interleaved PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bit depth of the extracted samples (16, 24 or 32)
    pub bit_depth: u32,
    /// Number of interleaved channels
    pub channels: usize,
    /// Bit depth the source container claims; differs from `bit_depth`
    /// when a 16-bit file was extracted into wider containers
    pub expected_bit_depth: u32,
}

impl PcmFormat {
    /// Create and validate a format where the claimed depth equals the extraction depth
    pub fn new(sample_rate: u32, bit_depth: u32, channels: usize) -> Result<Self> {
        Self::with_expected(sample_rate, bit_depth, channels, bit_depth)
    }

    /// Create and validate a format with an explicit claimed bit depth
    pub fn with_expected(
        sample_rate: u32,
        bit_depth: u32,
        channels: usize,
        expected_bit_depth: u32,
    ) -> Result<Self> {
        let format = Self {
            sample_rate,
            bit_depth,
            channels,
            expected_bit_depth,
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(AnalysisError::InvalidConfig(
                "channel count must be at least 1".to_string(),
            ));
        }
        for depth in [self.bit_depth, self.expected_bit_depth] {
            if !matches!(depth, 16 | 24 | 32) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "unsupported bit depth {} (expected 16, 24 or 32)",
                    depth
                )));
            }
        }
        Ok(())
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bit_depth / 8) as usize
    }

    /// Bytes occupied by one frame (one sample per channel)
    pub fn frame_bytes(&self) -> usize {
        self.bytes_per_sample() * self.channels
    }

    /// Largest representable integer sample
    pub fn int_max(&self) -> i32 {
        match self.bit_depth {
            16 => i16::MAX as i32,
            24 => (1 << 23) - 1,
            _ => i32::MAX,
        }
    }

    /// Smallest representable integer sample
    pub fn int_min(&self) -> i32 {
        match self.bit_depth {
            16 => i16::MIN as i32,
            24 => -(1 << 23),
            _ => i32::MIN,
        }
    }

    /// Divisor that maps integer samples into [-1.0, 1.0]
    pub fn scale(&self) -> f64 {
        (1u64 << (self.bit_depth - 1)) as f64
    }

    /// Number of whole frames covering `ms` milliseconds (at least one)
    pub fn frames_for_ms(&self, ms: f64) -> usize {
        ((self.sample_rate as f64 * ms / 1000.0) as usize).max(1)
    }
}
