// src/core/analysis/loudness.rs
//
// Loudness per ITU-R BS.1770 / EBU R128 and a crest-factor dynamic range
// score.

use std::collections::VecDeque;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::dsp::stats::{percentile, MIN_DB};
use crate::core::dsp::{amplitude_to_db, KWeighting};
use crate::core::pcm::SampleStream;
use crate::error::Result;

const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;
const LRA_RELATIVE_GATE_LU: f64 = -20.0;

/// Hops per momentary (400 ms) and short-term (3 s) window at 100 ms each
const MOMENTARY_HOPS: usize = 4;
const SHORT_TERM_HOPS: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoudnessResult {
    /// Gated integrated loudness, -120 when nothing passes the absolute gate
    pub integrated_lufs: f64,
    pub loudness_range_lu: f64,
    pub momentary_max_lufs: f64,
    pub short_term_max_lufs: f64,
    pub momentary_blocks: u64,
    /// Rounded DR score in 1..=20, 0 when unmeasurable
    pub dr_score: u32,
    pub dr_value: f64,
    pub dr_peak_db: f64,
    pub dr_rms_db: f64,
    pub dr_blocks: u64,
}

/// Convert a mean-square power to LUFS
fn power_to_lufs(power: f64) -> f64 {
    if power > 0.0 {
        (-0.691 + 10.0 * power.log10()).max(MIN_DB)
    } else {
        MIN_DB
    }
}

/// BS.1770 channel weight. LFE sits at index 3 in layouts of six or more channels.
fn channel_weight(channel: usize, channels: usize) -> f64 {
    match (channels, channel) {
        (5, 3) | (5, 4) => 1.41,
        (c, 3) if c >= 6 => 0.0,
        (c, 4) | (c, 5) if c >= 6 => 1.41,
        _ => 1.0,
    }
}

/// Peak and power of one 3 s DR block
#[derive(Debug, Clone, Copy, Default)]
struct DrBlock {
    peak: f64,
    power_sum: f64,
    frames: u64,
}

impl DrBlock {
    fn rms(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            (self.power_sum / self.frames as f64).sqrt()
        }
    }
}

/// Integrated loudness with the absolute and relative gates applied
fn gated_integrated(momentary: &[f64]) -> f64 {
    let absolute: Vec<f64> = momentary
        .iter()
        .copied()
        .filter(|&p| power_to_lufs(p) > ABSOLUTE_GATE_LUFS)
        .collect();
    if absolute.is_empty() {
        return MIN_DB;
    }
    let ungated = absolute.iter().sum::<f64>() / absolute.len() as f64;
    let relative_gate = power_to_lufs(ungated) + RELATIVE_GATE_LU;

    let (sum, count) = absolute
        .iter()
        .filter(|&&p| power_to_lufs(p) > relative_gate)
        .fold((0.0, 0usize), |(s, n), &p| (s + p, n + 1));
    if count == 0 {
        return MIN_DB;
    }
    power_to_lufs(sum / count as f64)
}

/// Loudness range from short-term powers (EBU Tech 3342)
fn loudness_range(short_term: &[f64]) -> f64 {
    let gated: Vec<f64> = short_term
        .iter()
        .copied()
        .filter(|&p| power_to_lufs(p) > ABSOLUTE_GATE_LUFS)
        .collect();
    if gated.is_empty() {
        return 0.0;
    }
    let mean_power = gated.iter().sum::<f64>() / gated.len() as f64;
    let gate = power_to_lufs(mean_power) + LRA_RELATIVE_GATE_LU;

    let mut levels: Vec<f64> = gated
        .iter()
        .map(|&p| power_to_lufs(p))
        .filter(|&l| l >= gate)
        .collect();
    if levels.is_empty() {
        return 0.0;
    }
    levels.sort_by(|a, b| a.total_cmp(b));
    percentile(&levels, 95.0) - percentile(&levels, 10.0)
}

/// DR from block statistics: second-highest peak over the mean of the loudest 20% RMS
fn dynamic_range(blocks: &[DrBlock]) -> (f64, f64, Option<f64>) {
    if blocks.is_empty() {
        return (0.0, 0.0, None);
    }
    let mut peaks: Vec<f64> = blocks.iter().map(|b| b.peak).collect();
    peaks.sort_by(|a, b| b.total_cmp(a));
    let peak = if peaks.len() > 1 { peaks[1] } else { peaks[0] };

    let mut rms: Vec<f64> = blocks.iter().map(DrBlock::rms).collect();
    rms.sort_by(|a, b| b.total_cmp(a));
    let top = ((rms.len() as f64 * 0.2) as usize).max(1);
    let rms = rms[..top].iter().sum::<f64>() / top as f64;

    let dr = (peak > 0.0 && rms > 0.0).then(|| 20.0 * (peak / rms).log10());
    (peak, rms, dr)
}

#[derive(Debug, Clone, Default)]
pub struct LoudnessAnalyzer;

impl LoudnessAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze<R: Read>(&self, stream: &mut SampleStream<R>) -> Result<LoudnessResult> {
        let format = *stream.format();
        let channels = format.channels;
        let scale = format.scale();
        let rate = format.sample_rate as u64;

        let mut filters: Vec<KWeighting> = (0..channels).map(|_| KWeighting::new(format.sample_rate)).collect();
        let weights: Vec<f64> = (0..channels).map(|ch| channel_weight(ch, channels)).collect();

        let hop_frames = (rate / 10).max(1);
        let dr_block_frames = rate * 3;

        let mut hops: VecDeque<f64> = VecDeque::with_capacity(SHORT_TERM_HOPS + 1);
        let mut hop_sum = 0.0f64;
        let mut hop_fill = 0u64;
        let mut momentary: Vec<f64> = Vec::new();
        let mut short_term: Vec<f64> = Vec::new();

        let mut blocks: Vec<DrBlock> = Vec::new();
        let mut block = DrBlock::default();

        while let Some(chunk) = stream.next_chunk()? {
            for frame in chunk.chunks_exact(channels) {
                let mut frame_power = 0.0;
                for ((&raw, filter), &w) in frame.iter().zip(filters.iter_mut()).zip(&weights) {
                    let x = raw as f64 / scale;
                    let y = filter.process(x);
                    frame_power += w * y * y;
                    block.peak = block.peak.max(x.abs());
                }

                block.power_sum += frame_power / channels as f64;
                block.frames += 1;
                if block.frames == dr_block_frames {
                    blocks.push(block);
                    block = DrBlock::default();
                }

                hop_sum += frame_power;
                hop_fill += 1;
                if hop_fill == hop_frames {
                    hops.push_back(hop_sum);
                    if hops.len() > SHORT_TERM_HOPS {
                        hops.pop_front();
                    }
                    hop_sum = 0.0;
                    hop_fill = 0;

                    if hops.len() >= MOMENTARY_HOPS {
                        let sum: f64 = hops.iter().rev().take(MOMENTARY_HOPS).sum();
                        momentary.push(sum / (MOMENTARY_HOPS as u64 * hop_frames) as f64);
                    }
                    if hops.len() == SHORT_TERM_HOPS {
                        let sum: f64 = hops.iter().sum();
                        short_term.push(sum / (SHORT_TERM_HOPS as u64 * hop_frames) as f64);
                    }
                }
            }
        }
        // a partial block only counts when the stream is shorter than one block
        if blocks.is_empty() && block.frames > 0 {
            blocks.push(block);
        }

        let max_lufs = |powers: &[f64]| powers.iter().copied().fold(MIN_DB, |m, p| m.max(power_to_lufs(p)));
        let (peak, rms, dr) = dynamic_range(&blocks);
        let dr_score = dr.map_or(0, |v| v.round().clamp(1.0, 20.0) as u32);
        let dr_value = dr.unwrap_or(0.0);

        let result = LoudnessResult {
            integrated_lufs: gated_integrated(&momentary),
            loudness_range_lu: loudness_range(&short_term),
            momentary_max_lufs: max_lufs(&momentary),
            short_term_max_lufs: max_lufs(&short_term),
            momentary_blocks: momentary.len() as u64,
            dr_score,
            dr_value,
            dr_peak_db: amplitude_to_db(peak),
            dr_rms_db: amplitude_to_db(rms),
            dr_blocks: blocks.len() as u64,
        };

        log::debug!(
            "loudness: {:.1} LUFS, LRA {:.1} LU, DR{}",
            result.integrated_lufs,
            result.loudness_range_lu,
            result.dr_score
        );
        Ok(result)
    }
}
