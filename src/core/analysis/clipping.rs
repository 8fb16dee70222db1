//! Clipping detection analysis
//!
//! Counts runs of consecutive full-scale samples per channel. A run of at
//! least `min_run` samples sitting on the positive or negative rail is one
//! clipping event.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::pcm::SampleStream;
use crate::error::Result;

/// Clipping statistics for one channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelClipping {
    pub events: u64,
    pub clipped_samples: u64,
    pub longest_run: u64,
}

/// Clipping detection result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClippingResult {
    /// Runs of rail samples across all channels
    pub events: u64,
    /// Samples belonging to those runs
    pub clipped_samples: u64,
    /// Longest run on any channel
    pub longest_run: u64,
    /// Total samples examined (all channels)
    pub samples: u64,
    pub per_channel: Vec<ChannelClipping>,
}

/// Clipping detection analyzer
#[derive(Debug, Clone)]
pub struct ClippingDetector {
    /// Minimum consecutive rail samples to count as an event
    min_run: u64,
}

impl Default for ClippingDetector {
    fn default() -> Self {
        Self { min_run: 2 }
    }
}

impl ClippingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_run(mut self, min_run: u64) -> Self {
        self.min_run = min_run.max(1);
        self
    }

    pub fn analyze<R: Read>(&self, stream: &mut SampleStream<R>) -> Result<ClippingResult> {
        let format = *stream.format();
        let (lo, hi) = (format.int_min(), format.int_max());
        let channels = format.channels;

        let mut runs = vec![0u64; channels];
        let mut per_channel = vec![ChannelClipping::default(); channels];
        let mut samples = 0u64;

        while let Some(chunk) = stream.next_chunk()? {
            samples += chunk.len() as u64;
            for frame in chunk.chunks_exact(channels) {
                for (ch, &s) in frame.iter().enumerate() {
                    if s == lo || s == hi {
                        runs[ch] += 1;
                    } else if runs[ch] > 0 {
                        self.close_run(&mut per_channel[ch], runs[ch]);
                        runs[ch] = 0;
                    }
                }
            }
        }

        for (ch, &run) in runs.iter().enumerate() {
            if run > 0 {
                self.close_run(&mut per_channel[ch], run);
            }
        }

        let result = ClippingResult {
            events: per_channel.iter().map(|c| c.events).sum(),
            clipped_samples: per_channel.iter().map(|c| c.clipped_samples).sum(),
            longest_run: per_channel.iter().map(|c| c.longest_run).max().unwrap_or(0),
            samples,
            per_channel,
        };

        log::debug!(
            "clipping: {} events, {} samples clipped of {}",
            result.events,
            result.clipped_samples,
            result.samples
        );
        Ok(result)
    }

    fn close_run(&self, stats: &mut ChannelClipping, run: u64) {
        if run >= self.min_run {
            stats.events += 1;
            stats.clipped_samples += run;
            stats.longest_run = stats.longest_run.max(run);
        }
    }
}
