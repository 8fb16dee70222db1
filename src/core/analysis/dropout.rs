//! Dropout and glitch detection
//!
//! Streams every channel through three detectors:
//! - **Delta**: a jump larger than `delta_threshold` into or out of near-zero
//! - **Zero run**: consecutive digital zeros in otherwise audible material
//! - **DC jump**: a step between consecutive 50 ms block means
//!
//! Delta candidates from the same frame are compared across channels before
//! being reported, so a transient that hits every channel at once (music)
//! is not mistaken for a dropout on one of them.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::dsp::{amplitude_to_db, db_to_amplitude};
use crate::core::pcm::SampleStream;
use crate::error::Result;

/// Events kept in the result; counts keep going past this
const MAX_STORED_EVENTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropoutKind {
    Delta,
    ZeroRun,
    DcJump,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoutEvent {
    pub kind: DropoutKind,
    pub channel: usize,
    pub time_sec: f64,
    /// Jump size for delta and DC events, run length in seconds for zero runs
    pub severity: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropoutResult {
    pub delta_events: u64,
    pub zero_run_events: u64,
    pub dc_jump_events: u64,
    pub total_events: u64,
    /// Largest delta or DC jump in dB, -120 when there were none
    pub worst_db: f64,
    /// Longest zero run on any channel, regardless of the level around it
    pub longest_zero_run_ms: f64,
    pub events: Vec<DropoutEvent>,
    pub frames: u64,
}

/// Dropout detector parameters
#[derive(Debug, Clone)]
pub struct DropoutDetector {
    pub delta_threshold: f64,
    pub near_zero: f64,
    pub quiet_db: f64,
    pub min_zero_run_ms: f64,
    pub dc_window_ms: f64,
    pub dc_jump_threshold: f64,
}

impl Default for DropoutDetector {
    fn default() -> Self {
        Self {
            delta_threshold: 0.6,
            near_zero: 0.01,
            quiet_db: -50.0,
            min_zero_run_ms: 1.0,
            dc_window_ms: 50.0,
            dc_jump_threshold: 0.1,
        }
    }
}

/// A delta candidate waiting for the cross-channel check
#[derive(Debug, Clone, Copy)]
struct Candidate {
    channel: usize,
    delta: f64,
}

struct ChannelState {
    prev: Option<f64>,
    /// Squared samples over the last `dc_window` frames
    sq_ring: Vec<f64>,
    sq_sum: f64,
    ring_pos: usize,
    ring_filled: usize,
    block_sum: f64,
    prev_block_mean: Option<f64>,
    zero_run: u64,
    zero_run_start: u64,
    zero_run_audible: bool,
}

impl ChannelState {
    fn new(window: usize) -> Self {
        Self {
            prev: None,
            sq_ring: vec![0.0; window],
            sq_sum: 0.0,
            ring_pos: 0,
            ring_filled: 0,
            block_sum: 0.0,
            prev_block_mean: None,
            zero_run: 0,
            zero_run_start: 0,
            zero_run_audible: false,
        }
    }

    fn recent_rms(&self) -> f64 {
        if self.ring_filled == 0 {
            return 0.0;
        }
        (self.sq_sum.max(0.0) / self.ring_filled as f64).sqrt()
    }

    /// Push a sample into the rings; returns the finished block mean when the ring wraps
    fn push(&mut self, x: f64) -> Option<f64> {
        let window = self.sq_ring.len();
        let sq = x * x;
        self.sq_sum += sq - self.sq_ring[self.ring_pos];
        self.sq_ring[self.ring_pos] = sq;
        self.block_sum += x;
        self.ring_pos += 1;
        self.ring_filled = (self.ring_filled + 1).min(window);
        if self.ring_pos == window {
            self.ring_pos = 0;
            // resync the running sum once per block
            self.sq_sum = self.sq_ring.iter().sum();
            let block_mean = self.block_sum / window as f64;
            self.block_sum = 0.0;
            Some(block_mean)
        } else {
            None
        }
    }
}

struct Tally {
    rate: f64,
    delta: u64,
    zero_run: u64,
    dc_jump: u64,
    max_jump: f64,
    longest_zero_run: u64,
    events: Vec<DropoutEvent>,
}

impl Tally {
    fn record(&mut self, event: DropoutEvent) {
        match event.kind {
            DropoutKind::Delta => self.delta += 1,
            DropoutKind::ZeroRun => self.zero_run += 1,
            DropoutKind::DcJump => self.dc_jump += 1,
        }
        if event.kind != DropoutKind::ZeroRun {
            self.max_jump = self.max_jump.max(event.severity);
        }
        if self.events.len() < MAX_STORED_EVENTS {
            self.events.push(event);
        }
    }

    fn emit_delta(&mut self, c: Candidate, frame: u64) {
        self.record(DropoutEvent {
            kind: DropoutKind::Delta,
            channel: c.channel,
            time_sec: frame as f64 / self.rate,
            severity: c.delta.abs(),
            duration_ms: 0.0,
        });
    }
}

impl DropoutDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delta_threshold(mut self, threshold: f64) -> Self {
        self.delta_threshold = threshold;
        self
    }

    pub fn with_quiet_db(mut self, quiet_db: f64) -> Self {
        self.quiet_db = quiet_db;
        self
    }

    pub fn analyze<R: Read>(&self, stream: &mut SampleStream<R>) -> Result<DropoutResult> {
        let format = *stream.format();
        let channels = format.channels;
        let scale = format.scale();
        let rate = format.sample_rate as f64;

        let window = format.frames_for_ms(self.dc_window_ms);
        let min_zero_run = ((rate * self.min_zero_run_ms / 1000.0) as u64).max(1);
        let quiet = db_to_amplitude(self.quiet_db);

        let mut states: Vec<ChannelState> = (0..channels).map(|_| ChannelState::new(window)).collect();
        let mut tally = Tally {
            rate,
            delta: 0,
            zero_run: 0,
            dc_jump: 0,
            max_jump: 0.0,
            longest_zero_run: 0,
            events: Vec::new(),
        };
        let mut candidates: Vec<Candidate> = Vec::with_capacity(channels);
        let mut frame_index = 0u64;

        while let Some(chunk) = stream.next_chunk()? {
            for frame in chunk.chunks_exact(channels) {
                candidates.clear();

                for (ch, (&raw, state)) in frame.iter().zip(states.iter_mut()).enumerate() {
                    let x = raw as f64 / scale;

                    if let Some(prev) = state.prev {
                        let delta = x - prev;
                        if delta.abs() > self.delta_threshold
                            && (prev.abs() < self.near_zero || x.abs() < self.near_zero)
                        {
                            candidates.push(Candidate { channel: ch, delta });
                        }
                    }
                    state.prev = Some(x);

                    if raw == 0 {
                        if state.zero_run == 0 {
                            state.zero_run_start = frame_index;
                            state.zero_run_audible = state.recent_rms() >= quiet;
                        }
                        state.zero_run += 1;
                    } else if state.zero_run > 0 {
                        self.close_zero_run(state, ch, min_zero_run, &mut tally);
                    }

                    if let Some(block_mean) = state.push(x) {
                        if let Some(prev_mean) = state.prev_block_mean {
                            let jump = (block_mean - prev_mean).abs();
                            if jump > self.dc_jump_threshold {
                                tally.record(DropoutEvent {
                                    kind: DropoutKind::DcJump,
                                    channel: ch,
                                    time_sec: (frame_index + 1 - window as u64) as f64 / rate,
                                    severity: jump,
                                    duration_ms: 0.0,
                                });
                            }
                        }
                        state.prev_block_mean = Some(block_mean);
                    }
                }

                if !candidates.is_empty() {
                    self.correlate(&candidates, channels, frame_index, &mut tally);
                }
                frame_index += 1;
            }
        }

        for (ch, state) in states.iter_mut().enumerate() {
            if state.zero_run > 0 {
                self.close_zero_run(state, ch, min_zero_run, &mut tally);
            }
        }

        let total_events = tally.delta + tally.zero_run + tally.dc_jump;
        let worst_db = amplitude_to_db(tally.max_jump);

        log::debug!(
            "dropouts: {} delta, {} zero-run, {} dc-jump (worst {:.1} dB)",
            tally.delta,
            tally.zero_run,
            tally.dc_jump,
            worst_db
        );

        Ok(DropoutResult {
            delta_events: tally.delta,
            zero_run_events: tally.zero_run,
            dc_jump_events: tally.dc_jump,
            total_events,
            worst_db,
            longest_zero_run_ms: tally.longest_zero_run as f64 * 1000.0 / rate,
            events: tally.events,
            frames: frame_index,
        })
    }

    fn close_zero_run(&self, state: &mut ChannelState, channel: usize, min_run: u64, tally: &mut Tally) {
        let run = state.zero_run;
        tally.longest_zero_run = tally.longest_zero_run.max(run);
        if run >= min_run && state.zero_run_audible {
            tally.record(DropoutEvent {
                kind: DropoutKind::ZeroRun,
                channel,
                time_sec: state.zero_run_start as f64 / tally.rate,
                severity: run as f64 / tally.rate,
                duration_ms: run as f64 * 1000.0 / tally.rate,
            });
        }
        state.zero_run = 0;
    }

    /// Decide which of one frame's delta candidates are real dropouts
    fn correlate(&self, candidates: &[Candidate], channels: usize, frame: u64, tally: &mut Tally) {
        if candidates.len() == 1 {
            tally.emit_delta(candidates[0], frame);
            return;
        }

        if channels == 2 {
            let (a, b) = (candidates[0].delta, candidates[1].delta);
            let same_sign = a.signum() == b.signum();
            let (small, large) = if a.abs() < b.abs() { (a.abs(), b.abs()) } else { (b.abs(), a.abs()) };
            if !(same_sign && small >= 0.5 * large) {
                tally.emit_delta(candidates[0], frame);
                tally.emit_delta(candidates[1], frame);
            }
            return;
        }

        let majority = (channels + 1) / 2;
        let (rising, falling): (Vec<Candidate>, Vec<Candidate>) =
            candidates.iter().partition(|c| c.delta > 0.0);
        if rising.len() >= majority || falling.len() >= majority {
            let minority = match rising.len().cmp(&falling.len()) {
                std::cmp::Ordering::Greater => falling,
                std::cmp::Ordering::Less => rising,
                std::cmp::Ordering::Equal => Vec::new(),
            };
            for c in minority {
                tally.emit_delta(c, frame);
            }
        } else {
            for &c in candidates {
                tally.emit_delta(c, frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancelToken;
    use crate::core::format::PcmFormat;
    use crate::core::pcm::SampleWidth;
    use std::f64::consts::PI;
    use std::io::Cursor;

    fn run(format: PcmFormat, frames: usize, f: impl Fn(usize, usize) -> f64) -> DropoutResult {
        let mut bytes = Vec::new();
        for i in 0..frames {
            for ch in 0..format.channels {
                SampleWidth::I16.encode((f(i, ch) * 32767.0) as i32, &mut bytes);
            }
        }
        let mut stream = SampleStream::new(Cursor::new(bytes), format, CancelToken::new()).unwrap();
        DropoutDetector::new().analyze(&mut stream).unwrap()
    }

    #[test]
    fn test_clean_sine_has_no_events() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        let r = run(format, 44100, |i, _| 0.5 * (2.0 * PI * 440.0 * i as f64 / 44100.0).sin());
        assert_eq!(r.total_events, 0);
        assert_eq!(r.worst_db, -120.0);
    }

    #[test]
    fn test_zero_gap_in_audible_signal() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        // 5 ms hole at 0.5 s
        let r = run(format, 44100, |i, _| {
            if (22050..22050 + 220).contains(&i) {
                0.0
            } else {
                0.5 * (2.0 * PI * 1000.0 * i as f64 / 44100.0).sin()
            }
        });
        assert_eq!(r.zero_run_events, 1);
        assert_eq!(r.delta_events, 0);
        let event = r.events.iter().find(|e| e.kind == DropoutKind::ZeroRun).unwrap();
        assert!((event.time_sec - 0.5).abs() < 0.001);
        assert!(event.duration_ms >= 4.9);
    }

    #[test]
    fn test_stored_events_are_capped() {
        let format = PcmFormat::new(44100, 16, 1).unwrap();
        // one 100-sample hole in every 50 ms block, 150 blocks
        let r = run(format, 2205 * 150, |i, _| {
            if (1000..1100).contains(&(i % 2205)) {
                0.0
            } else {
                0.5 * (2.0 * PI * 1000.0 * i as f64 / 44100.0).sin()
            }
        });
        assert_eq!(r.zero_run_events, 150);
        assert_eq!(r.total_events, 150);
        assert_eq!(r.events.len(), MAX_STORED_EVENTS);
        assert!(r.events.iter().all(|e| e.kind == DropoutKind::ZeroRun));
    }

    #[test]
    fn test_digital_silence_is_not_a_dropout() {
        let format = PcmFormat::new(8000, 16, 1).unwrap();
        let r = run(format, 8000, |_, _| 0.0);
        assert_eq!(r.total_events, 0);
        assert!((r.longest_zero_run_ms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample_click_on_mono() {
        let format = PcmFormat::new(8000, 16, 1).unwrap();
        // a single zero sample inside a constant 0.7 level
        let r = run(format, 8000, |i, _| if i == 4100 { 0.0 } else { 0.7 });
        assert_eq!(r.delta_events, 2);
        assert!(r.worst_db > -3.5 && r.worst_db < -2.5);
    }

    #[test]
    fn test_correlated_stereo_jump_is_music() {
        let format = PcmFormat::new(8000, 16, 2).unwrap();
        let r = run(format, 8000, |i, ch| {
            if i < 100 {
                0.0
            } else if ch == 0 {
                0.8
            } else {
                0.7
            }
        });
        assert_eq!(r.delta_events, 0);
    }

    #[test]
    fn test_single_channel_jump_in_stereo() {
        let format = PcmFormat::new(8000, 16, 2).unwrap();
        let r = run(format, 8000, |i, ch| if ch == 0 && i == 5000 { 0.0 } else { 0.7 });
        assert_eq!(r.delta_events, 2);
        assert!(r.events.iter().all(|e| e.channel == 0));
    }

    #[test]
    fn test_surround_majority_discarded() {
        let format = PcmFormat::new(8000, 16, 4).unwrap();
        // channels 0..3 rise together, channel 3 falls at the same frame
        let r = run(format, 200, |i, ch| match (i < 100, ch) {
            (true, 3) => 0.8,
            (true, _) => 0.0,
            (false, 3) => 0.0,
            (false, _) => 0.8,
        });
        assert_eq!(r.delta_events, 1);
        assert_eq!(r.events[0].channel, 3);
    }

    #[test]
    fn test_dc_step() {
        let format = PcmFormat::new(8000, 16, 1).unwrap();
        let r = run(format, 8000, |i, _| if i < 4000 { 0.3 } else { -0.3 });
        assert_eq!(r.dc_jump_events, 1);
        assert_eq!(r.delta_events, 0);
        assert!((r.events[0].severity - 0.6).abs() < 0.001);
    }
}
