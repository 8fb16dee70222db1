// src/core/analysis/bit_depth.rs
//
// Bit depth authenticity: detects files whose claimed depth is zero-padded
// from a shallower source (16-bit audio in 24-bit containers and so on).

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::pcm::SampleStream;
use crate::error::Result;

/// Bit depth authenticity result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitDepthResult {
    /// Bit depth the source claims
    pub claimed: u32,
    /// Smallest depth consistent with the bits actually used
    pub effective: u32,
    /// Whether `effective < claimed`
    pub is_padded: bool,
    /// Samples examined before a decision was reached
    pub samples: u64,
}

/// OR every sample magnitude into a mask and report which low bits were never used.
///
/// A 16-bit extraction cannot reveal padding, so it is reported as authentic
/// without reading. The scan stops early as soon as the finest padding mask
/// has seen a set bit.
pub fn analyze_bit_depth<R: Read>(stream: &mut SampleStream<R>) -> Result<BitDepthResult> {
    let format = *stream.format();
    let claimed = format.expected_bit_depth;

    if format.bit_depth == 16 {
        return Ok(BitDepthResult {
            claimed,
            effective: claimed,
            is_padded: false,
            samples: 0,
        });
    }

    // bits below a 16-bit word, and (32-bit containers only) below a 24-bit word
    let mask16: u32 = (1u32 << (format.bit_depth - 16)) - 1;
    let mask24: u32 = if format.bit_depth == 32 { 0xFF } else { 0 };
    let finest = if mask24 != 0 { mask24 } else { mask16 };

    let mut used_bits = 0u32;
    let mut samples = 0u64;

    'scan: while let Some(chunk) = stream.next_chunk()? {
        for &sample in chunk {
            used_bits |= sample.unsigned_abs();
            samples += 1;
            if used_bits & finest != 0 {
                break 'scan;
            }
        }
    }

    let effective = if used_bits == 0 {
        // digital silence carries no evidence either way
        claimed
    } else if used_bits & mask16 == 0 {
        16
    } else if mask24 != 0 && used_bits & mask24 == 0 {
        24
    } else {
        format.bit_depth
    }
    .min(claimed);

    log::debug!(
        "bit depth: claimed {} effective {} after {} samples (mask {:#x})",
        claimed,
        effective,
        samples,
        used_bits
    );

    Ok(BitDepthResult {
        claimed,
        effective,
        is_padded: effective < claimed,
        samples,
    })
}
