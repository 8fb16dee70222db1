// src/core/analysis/silence.rs
//
// Windowed-RMS silence detection. Locates stretches of silence that meet a
// level and duration requirement, and how much of it pads the start and end.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::dsp::{amplitude_to_db, db_to_amplitude};
use crate::core::pcm::SampleStream;
use crate::error::Result;

/// One stretch of silence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub duration_sec: f64,
    pub rms_db: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SilenceResult {
    pub segments: Vec<SilenceSegment>,
    /// Silence starting at the first frame
    pub leading_sec: f64,
    /// Silence ending at the final frame
    pub trailing_sec: f64,
    pub total_silence_sec: f64,
    pub duration_sec: f64,
    pub threshold_db: f64,
    pub min_duration_ms: f64,
}

impl SilenceResult {
    /// Whether one segment spans the whole stream
    pub fn is_entirely_silent(&self) -> bool {
        self.duration_sec > 0.0
            && self.segments.len() == 1
            && self.leading_sec > 0.0
            && self.trailing_sec > 0.0
    }
}

/// Silence detector parameters
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    pub threshold_db: f64,
    pub min_duration_ms: f64,
    pub window_ms: f64,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self {
            threshold_db: -60.0,
            min_duration_ms: 1000.0,
            window_ms: 50.0,
        }
    }
}

/// An open silent stretch: start frame plus accumulated squares
struct OpenSegment {
    start: u64,
    sum_sq: f64,
    frames: u64,
}

/// Folds window levels into silent segments
struct Gate {
    threshold: f64,
    min_frames: u64,
    rate: f64,
    open: Option<OpenSegment>,
    segments: Vec<SilenceSegment>,
}

impl Gate {
    fn window(&mut self, start: u64, sum_sq: f64, frames: u64) {
        let rms = (sum_sq / frames as f64).sqrt();
        if rms < self.threshold {
            let seg = self.open.get_or_insert(OpenSegment {
                start,
                sum_sq: 0.0,
                frames: 0,
            });
            seg.sum_sq += sum_sq;
            seg.frames += frames;
        } else if let Some(seg) = self.open.take() {
            self.close(seg, start);
        }
    }

    fn close(&mut self, seg: OpenSegment, end: u64) {
        if end.saturating_sub(seg.start) >= self.min_frames && seg.frames > 0 {
            self.segments.push(SilenceSegment {
                start_sec: seg.start as f64 / self.rate,
                end_sec: end as f64 / self.rate,
                duration_sec: (end - seg.start) as f64 / self.rate,
                rms_db: amplitude_to_db((seg.sum_sq / seg.frames as f64).sqrt()),
            });
        }
    }

    /// Close any open segment at `end` and hand back the segment list
    fn finish(mut self, end: u64) -> Vec<SilenceSegment> {
        if let Some(seg) = self.open.take() {
            self.close(seg, end);
        }
        self.segments
    }
}

impl SilenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold_db(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    pub fn with_min_duration_ms(mut self, min_duration_ms: f64) -> Self {
        self.min_duration_ms = min_duration_ms;
        self
    }

    pub fn analyze<R: Read>(&self, stream: &mut SampleStream<R>) -> Result<SilenceResult> {
        let format = *stream.format();
        let rate = format.sample_rate as f64;
        let scale = format.scale();
        let channels = format.channels;

        let window_frames = format.frames_for_ms(self.window_ms) as u64;
        let min_frames = (rate * self.min_duration_ms / 1000.0) as u64;
        let threshold = db_to_amplitude(self.threshold_db);

        let mut gate = Gate {
            threshold,
            min_frames,
            rate,
            open: None,
            segments: Vec::new(),
        };
        let mut window_sum = 0.0f64;
        let mut window_fill = 0u64;
        let mut current_frame = 0u64;

        while let Some(chunk) = stream.next_chunk()? {
            for frame in chunk.chunks_exact(channels) {
                let mean_sq = frame
                    .iter()
                    .map(|&s| {
                        let v = s as f64 / scale;
                        v * v
                    })
                    .sum::<f64>()
                    / channels as f64;
                window_sum += mean_sq;
                window_fill += 1;
                current_frame += 1;

                if window_fill == window_frames {
                    gate.window(current_frame - window_fill, window_sum, window_fill);
                    window_sum = 0.0;
                    window_fill = 0;
                }
            }
        }

        // the short tail is measured on its own so it is never assumed silent
        if window_fill > 0 {
            gate.window(current_frame - window_fill, window_sum, window_fill);
        }
        let segments = gate.finish(current_frame);

        let duration_sec = current_frame as f64 / rate;
        let leading_sec = segments
            .first()
            .filter(|s| s.start_sec == 0.0)
            .map(|s| s.duration_sec)
            .unwrap_or(0.0);
        let trailing_sec = segments
            .last()
            .filter(|s| (s.end_sec - duration_sec).abs() < 0.5 / rate)
            .map(|s| s.duration_sec)
            .unwrap_or(0.0);
        let total_silence_sec = segments.iter().map(|s| s.duration_sec).sum();

        log::debug!(
            "silence: {} segments, leading {:.2}s, trailing {:.2}s",
            segments.len(),
            leading_sec,
            trailing_sec
        );

        Ok(SilenceResult {
            segments,
            leading_sec,
            trailing_sec,
            total_silence_sec,
            duration_sec,
            threshold_db: self.threshold_db,
            min_duration_ms: self.min_duration_ms,
        })
    }
}
