// src/core/analysis/truncation.rs
//
// Level of the final few milliseconds. A track that was cut off mid-note
// ends loud instead of fading to silence.

use std::io::{Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};

use crate::core::cancel::CancelToken;
use crate::core::dsp::amplitude_to_db;
use crate::core::format::PcmFormat;
use crate::core::pcm::SampleStream;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruncationResult {
    pub final_rms_db: f64,
    pub final_peak_db: f64,
    /// Samples (all channels) measured in the tail window
    pub samples_in_tail: u64,
    pub window_ms: f64,
}

#[derive(Debug, Clone)]
pub struct TruncationDetector {
    window_ms: f64,
}

impl Default for TruncationDetector {
    fn default() -> Self {
        Self { window_ms: 50.0 }
    }
}

impl TruncationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_ms(mut self, window_ms: f64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Seek to the final window (or the start of a shorter stream) and measure it
    pub fn analyze<R: Read + Seek>(
        &self,
        mut reader: R,
        format: PcmFormat,
        cancel: CancelToken,
    ) -> Result<TruncationResult> {
        format.validate()?;
        let frame_bytes = format.frame_bytes() as u64;
        let tail_bytes = (format.sample_rate as f64 * self.window_ms / 1000.0) as u64 * frame_bytes;

        let len = reader.seek(SeekFrom::End(0))?;
        let mut start = len.saturating_sub(tail_bytes);
        start -= start % frame_bytes;
        reader.seek(SeekFrom::Start(start))?;

        let scale = format.scale();
        let mut stream = SampleStream::new(reader, format, cancel)?;
        let mut peak = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut samples = 0u64;

        while let Some(chunk) = stream.next_chunk()? {
            for &s in chunk {
                let v = s as f64 / scale;
                peak = peak.max(v.abs());
                sum_sq += v * v;
            }
            samples += chunk.len() as u64;
        }

        let rms = if samples > 0 {
            (sum_sq / samples as f64).sqrt()
        } else {
            0.0
        };

        Ok(TruncationResult {
            final_rms_db: amplitude_to_db(rms),
            final_peak_db: amplitude_to_db(peak),
            samples_in_tail: samples,
            window_ms: self.window_ms,
        })
    }
}
