// src/core/analysis/dc_offset.rs
//
// Per-channel mean sample value.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::dsp::amplitude_to_db;
use crate::core::pcm::SampleStream;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcOffsetResult {
    /// Mean of the absolute per-channel offsets
    pub offset: f64,
    pub offset_db: f64,
    /// Signed mean per channel
    pub per_channel: Vec<f64>,
    /// Frames examined
    pub frames: u64,
}

pub fn analyze_dc_offset<R: Read>(stream: &mut SampleStream<R>) -> Result<DcOffsetResult> {
    let format = *stream.format();
    let scale = format.scale();
    let channels = format.channels;
    let mut sums = vec![0.0f64; channels];
    let mut frames = 0u64;

    while let Some(chunk) = stream.next_chunk()? {
        for frame in chunk.chunks_exact(channels) {
            for (sum, &s) in sums.iter_mut().zip(frame) {
                *sum += s as f64 / scale;
            }
            frames += 1;
        }
    }

    let per_channel: Vec<f64> = if frames == 0 {
        vec![0.0; channels]
    } else {
        sums.iter().map(|s| s / frames as f64).collect()
    };
    let offset = per_channel.iter().map(|o| o.abs()).sum::<f64>() / channels as f64;

    Ok(DcOffsetResult {
        offset,
        offset_db: amplitude_to_db(offset),
        per_channel,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancelToken;
    use crate::core::format::PcmFormat;
    use crate::core::pcm::SampleWidth;
    use std::io::Cursor;

    #[test]
    fn test_offset_is_mean_of_abs_channels() {
        let format = PcmFormat::new(44100, 16, 2).unwrap();
        let mut bytes = Vec::new();
        for _ in 0..1000 {
            SampleWidth::I16.encode(3277, &mut bytes); // ~ +0.1
            SampleWidth::I16.encode(-1638, &mut bytes); // ~ -0.05
        }
        let mut stream = SampleStream::new(Cursor::new(bytes), format, CancelToken::new()).unwrap();
        let r = analyze_dc_offset(&mut stream).unwrap();
        assert!((r.per_channel[0] - 0.1).abs() < 1e-3);
        assert!((r.per_channel[1] + 0.05).abs() < 1e-3);
        assert!((r.offset - 0.075).abs() < 1e-3);
        assert_eq!(r.frames, 1000);
    }

    #[test]
    fn test_empty_stream() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        let mut stream = SampleStream::new(Cursor::new(Vec::new()), format, CancelToken::new()).unwrap();
        let r = analyze_dc_offset(&mut stream).unwrap();
        assert_eq!(r.offset, 0.0);
        assert_eq!(r.offset_db, -120.0);
    }
}
