// src/core/analysis/spectral.rs
//
// Spectral analysis over evenly spaced FFT windows of the mono mix:
// brick-wall detection for fake sample rates and lossy transcodes, mains
// hum with a temporal-variance check, and a flatness-gated noise floor.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::dsp::stats::{mean, rms, spectral_centroid, spectral_flatness, std_dev, MIN_DB};
use crate::core::dsp::{amplitude_to_db, FftProcessor, WindowType};
use crate::core::pcm::SampleStream;
use crate::error::Result;

/// (original sample rate, its Nyquist cutoff)
const UPSAMPLE_CANDIDATES: [(u32, f64); 4] = [
    (44100, 22050.0),
    (48000, 24000.0),
    (88200, 44100.0),
    (96000, 48000.0),
];

/// Lowpass cutoffs typical of lossy encoders
const TRANSCODE_CANDIDATES: [(f64, &str); 7] = [
    (15500.0, "AAC 128k"),
    (16000.0, "MP3 128k"),
    (17500.0, "MP3 160k"),
    (18000.0, "MP3/AAC 192k"),
    (19000.0, "MP3/AAC 256k"),
    (20000.0, "MP3 320k"),
    (20500.0, "Opus 128k"),
];

const HUM_FUNDAMENTALS: [f64; 2] = [50.0, 60.0];
const HUM_HARMONICS: usize = 6;
const HUM_MIN_SPIKE_DB: f64 = 15.0;
const HUM_MAX_CV: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralResult {
    pub windows_analyzed: u64,
    pub fft_size: usize,
    /// Mean level over 1-10 kHz of the averaged spectrum
    pub reference_level_db: f64,

    pub is_upsampled: bool,
    pub effective_rate: u32,
    pub upsample_cutoff: f64,
    pub upsample_sharpness: f64,

    pub is_transcode: bool,
    pub transcode_cutoff: f64,
    pub transcode_codec: Option<String>,
    pub transcode_sharpness: f64,
    pub transcode_confidence: f64,
    /// Spread of the per-window cutoff, 0 when too few windows showed one
    pub cutoff_consistency_hz: f64,
    pub has_ultrasonic_content: bool,

    pub has_50_hz_hum: bool,
    pub has_60_hz_hum: bool,
    pub hum_50_hz_db: f64,
    pub hum_50_hz_cv: f64,
    pub hum_60_hz_db: f64,
    pub hum_60_hz_cv: f64,

    /// High-frequency level relative to the reference level
    pub noise_floor_db: f64,
    pub hf_flatness: f64,
    pub quiet_windows_rms_db: f64,
    pub spectral_centroid_hz: f64,
}

impl Default for SpectralResult {
    fn default() -> Self {
        Self {
            windows_analyzed: 0,
            fft_size: 0,
            reference_level_db: MIN_DB,
            is_upsampled: false,
            effective_rate: 0,
            upsample_cutoff: 0.0,
            upsample_sharpness: 0.0,
            is_transcode: false,
            transcode_cutoff: 0.0,
            transcode_codec: None,
            transcode_sharpness: 0.0,
            transcode_confidence: 0.0,
            cutoff_consistency_hz: 0.0,
            has_ultrasonic_content: false,
            has_50_hz_hum: false,
            has_60_hz_hum: false,
            hum_50_hz_db: 0.0,
            hum_50_hz_cv: 0.0,
            hum_60_hz_db: 0.0,
            hum_60_hz_cv: 0.0,
            noise_floor_db: MIN_DB,
            hf_flatness: 0.0,
            quiet_windows_rms_db: MIN_DB,
            spectral_centroid_hz: 0.0,
        }
    }
}

impl SpectralResult {
    /// Mean spike of the strongest detected hum fundamental
    pub fn hum_level_db(&self) -> f64 {
        let mut level: f64 = 0.0;
        if self.has_50_hz_hum {
            level = level.max(self.hum_50_hz_db);
        }
        if self.has_60_hz_hum {
            level = level.max(self.hum_60_hz_db);
        }
        level
    }
}

/// Spectral analyzer configuration
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    pub fft_size: usize,
    pub windows_max: usize,
    pub noise_flatness_cutoff: f64,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self {
            fft_size: 8192,
            windows_max: 100,
            noise_flatness_cutoff: 0.4,
        }
    }
}

/// Averaged and per-window spectra of one track
struct Spectra {
    bin_hz: f64,
    nyquist: f64,
    avg_mag: Vec<f64>,
    avg_db: Vec<f64>,
    window_mag: Vec<Vec<f64>>,
    window_db: Vec<Vec<f64>>,
    window_rms: Vec<f64>,
    reference_db: f64,
}

impl Spectra {
    /// Inclusive bin range covering `lo_hz..=hi_hz`, `None` when empty
    fn bins(&self, lo_hz: f64, hi_hz: f64) -> Option<(usize, usize)> {
        let last = self.avg_db.len().checked_sub(1)?;
        let lo = (lo_hz.max(0.0) / self.bin_hz).ceil() as usize;
        let hi = ((hi_hz / self.bin_hz).floor().max(0.0) as usize).min(last);
        (lo <= hi && hi_hz > 0.0).then_some((lo, hi))
    }

    fn band_db(&self, db: &[f64], lo_hz: f64, hi_hz: f64) -> Option<f64> {
        self.bins(lo_hz, hi_hz).map(|(lo, hi)| mean(&db[lo..=hi]))
    }

    /// `(drop_db, sharpness_db_per_octave)` of a cutoff at `freq`
    fn brick_wall(&self, freq: f64) -> (f64, f64) {
        let below = self.band_db(&self.avg_db, freq - 1500.0, freq - 500.0);
        let above = self.band_db(&self.avg_db, freq + 500.0, freq + 1500.0);
        match (below, above) {
            (Some(b), Some(a)) => {
                let drop = b - a;
                let sharpness = if drop > 10.0 {
                    drop / ((freq + 1000.0) / (freq - 1000.0)).log2()
                } else {
                    0.0
                };
                (drop, sharpness)
            }
            _ => (0.0, 0.0),
        }
    }
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn with_windows_max(mut self, windows_max: usize) -> Self {
        self.windows_max = windows_max.max(1);
        self
    }

    /// Read the stream into a mono mix and analyze it
    pub fn analyze<R: Read>(&self, stream: &mut SampleStream<R>) -> Result<SpectralResult> {
        let format = *stream.format();
        let channels = format.channels;
        let scale = format.scale() * channels as f64;

        let mut mono = Vec::new();
        while let Some(chunk) = stream.next_chunk()? {
            mono.extend(
                chunk
                    .chunks_exact(channels)
                    .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / scale),
            );
        }
        self.analyze_samples(&mono, format.sample_rate)
    }

    /// Analyze an already mixed mono signal
    pub fn analyze_samples(&self, mono: &[f64], sample_rate: u32) -> Result<SpectralResult> {
        let positions = self.window_positions(mono.len());
        if positions.is_empty() {
            log::debug!("spectral: stream shorter than one {}-point window", self.fft_size);
            return Ok(SpectralResult {
                fft_size: self.fft_size,
                ..Default::default()
            });
        }

        let spectra = self.compute_spectra(mono, sample_rate, &positions)?;
        let mut result = SpectralResult {
            windows_analyzed: positions.len() as u64,
            fft_size: self.fft_size,
            reference_level_db: spectra.reference_db,
            spectral_centroid_hz: spectral_centroid(&spectra.avg_mag, spectra.bin_hz),
            ..Default::default()
        };

        self.detect_upsampling(&spectra, sample_rate, &mut result);
        self.detect_transcode(&spectra, &mut result);
        self.detect_hum(&spectra, &mut result);
        self.measure_noise_floor(&spectra, &mut result);

        log::debug!(
            "spectral: {} windows, ref {:.1} dB, upsampled={} transcode={} ({:.2}), hum50={} hum60={}, floor {:.1} dB",
            result.windows_analyzed,
            result.reference_level_db,
            result.is_upsampled,
            result.is_transcode,
            result.transcode_confidence,
            result.has_50_hz_hum,
            result.has_60_hz_hum,
            result.noise_floor_db
        );
        Ok(result)
    }

    /// Start offsets of the FFT windows
    fn window_positions(&self, total: usize) -> Vec<usize> {
        if total < self.fft_size || self.fft_size == 0 {
            return Vec::new();
        }
        let hop = (self.fft_size / 2).max(1);
        let span = total - self.fft_size;
        let hop_count = span / hop + 1;

        if hop_count <= self.windows_max {
            (0..hop_count).map(|i| i * hop).collect()
        } else if self.windows_max == 1 {
            vec![span / 2]
        } else {
            let n = self.windows_max;
            (0..n).map(|i| i * span / (n - 1)).collect()
        }
    }

    fn compute_spectra(&self, mono: &[f64], sample_rate: u32, positions: &[usize]) -> Result<Spectra> {
        let mut fft = FftProcessor::new(self.fft_size, WindowType::Hann);
        let bins = self.fft_size / 2 + 1;
        let mut sum = vec![0.0f64; bins];
        let mut window_mag = Vec::with_capacity(positions.len());
        let mut window_db = Vec::with_capacity(positions.len());
        let mut window_rms = Vec::with_capacity(positions.len());

        for &pos in positions {
            let slice = &mono[pos..pos + self.fft_size];
            let mags = fft.magnitude_spectrum(slice)?;
            for (acc, &m) in sum.iter_mut().zip(&mags) {
                *acc += m;
            }
            window_db.push(mags.iter().map(|&m| amplitude_to_db(m)).collect::<Vec<f64>>());
            window_mag.push(mags);
            window_rms.push(rms(slice));
        }

        let n = positions.len() as f64;
        let avg_mag: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let avg_db: Vec<f64> = avg_mag.iter().map(|&m| amplitude_to_db(m)).collect();

        let mut spectra = Spectra {
            bin_hz: sample_rate as f64 / self.fft_size as f64,
            nyquist: sample_rate as f64 / 2.0,
            avg_mag,
            avg_db,
            window_mag,
            window_db,
            window_rms,
            reference_db: MIN_DB,
        };
        let ref_hi = 10000.0f64.min(spectra.nyquist);
        spectra.reference_db = spectra
            .band_db(&spectra.avg_db, 1000.0, ref_hi)
            .unwrap_or(MIN_DB);
        Ok(spectra)
    }

    fn detect_upsampling(&self, spectra: &Spectra, sample_rate: u32, result: &mut SpectralResult) {
        if sample_rate <= 44100 {
            return;
        }
        let best = UPSAMPLE_CANDIDATES
            .iter()
            .filter(|(_, cutoff)| *cutoff < spectra.nyquist)
            .map(|&(rate, cutoff)| {
                let (drop, sharpness) = spectra.brick_wall(cutoff);
                (rate, cutoff, drop, sharpness)
            })
            .filter(|&(_, _, drop, _)| drop > 20.0)
            .max_by(|a, b| a.3.total_cmp(&b.3));

        if let Some((rate, cutoff, _, sharpness)) = best {
            if sharpness > 40.0 {
                result.is_upsampled = true;
                result.effective_rate = rate;
                result.upsample_cutoff = cutoff;
                result.upsample_sharpness = sharpness;
            }
        }
    }

    fn detect_transcode(&self, spectra: &Spectra, result: &mut SpectralResult) {
        let upsample_cutoff = result.is_upsampled.then_some(result.upsample_cutoff);
        let best = TRANSCODE_CANDIDATES
            .iter()
            .filter(|(cutoff, _)| *cutoff < spectra.nyquist)
            .filter(|(cutoff, _)| upsample_cutoff.map_or(true, |u| (cutoff - u).abs() > 2000.0))
            .map(|&(cutoff, codec)| {
                let (drop, sharpness) = spectra.brick_wall(cutoff);
                (cutoff, codec, drop, sharpness)
            })
            .filter(|&(_, _, drop, sharpness)| drop > 15.0 && sharpness > 30.0)
            .max_by(|a, b| a.3.total_cmp(&b.3));

        let Some((cutoff, codec, _, sharpness)) = best else {
            return;
        };

        let mut confidence = 0.95;

        let cutoffs: Vec<f64> = spectra
            .window_db
            .iter()
            .filter_map(|db| steepest_drop(db, spectra, cutoff))
            .collect();
        if cutoffs.len() >= 3 {
            let spread = std_dev(&cutoffs);
            result.cutoff_consistency_hz = spread;
            if spread < 50.0 {
                confidence -= 0.20 * (1.0 - spread / 50.0);
            }
        }

        if let Some(ultra) = spectra.band_db(&spectra.avg_db, cutoff + 500.0, spectra.nyquist - 500.0) {
            if ultra - spectra.reference_db > -50.0 {
                result.has_ultrasonic_content = true;
                confidence -= 0.40;
            }
        }

        if cutoff >= 20000.0 {
            confidence -= (0.10 + (cutoff - 20000.0) / 5000.0 * 0.10).min(0.20);
        }
        if sharpness < 40.0 {
            confidence -= 0.10;
        }

        let confidence = confidence.clamp(0.0, 1.0);
        result.is_transcode = confidence >= 0.50;
        result.transcode_cutoff = cutoff;
        result.transcode_codec = Some(codec.to_string());
        result.transcode_sharpness = sharpness;
        result.transcode_confidence = confidence;
    }

    fn detect_hum(&self, spectra: &Spectra, result: &mut SpectralResult) {
        for f0 in HUM_FUNDAMENTALS {
            let spikes: Vec<f64> = spectra
                .window_db
                .iter()
                .map(|db| {
                    (1..=HUM_HARMONICS)
                        .filter_map(|h| harmonic_spike(db, f0 * h as f64 / spectra.bin_hz))
                        .fold(0.0, f64::max)
                })
                .collect();

            let level = mean(&spikes);
            let cv = if level > 0.0 { std_dev(&spikes) / level } else { 0.0 };
            let detected = level > HUM_MIN_SPIKE_DB && cv < HUM_MAX_CV;

            if f0 == 50.0 {
                result.hum_50_hz_db = level;
                result.hum_50_hz_cv = cv;
                result.has_50_hz_hum = detected;
            } else {
                result.hum_60_hz_db = level;
                result.hum_60_hz_cv = cv;
                result.has_60_hz_hum = detected;
            }
        }
    }

    fn measure_noise_floor(&self, spectra: &Spectra, result: &mut SpectralResult) {
        let hf_hi = 18000.0f64.min(spectra.nyquist - 500.0);
        let Some((lo, hi)) = spectra.bins(14000.0, hf_hi) else {
            return;
        };
        if spectra.reference_db <= MIN_DB {
            return;
        }

        let mut order: Vec<usize> = (0..spectra.window_rms.len()).collect();
        order.sort_by(|&a, &b| spectra.window_rms[a].total_cmp(&spectra.window_rms[b]));
        let quiet_count = (order.len() / 5).max(1);
        let quiet = &order[..quiet_count];

        let quiet_rms = mean(&quiet.iter().map(|&i| spectra.window_rms[i]).collect::<Vec<f64>>());
        result.quiet_windows_rms_db = amplitude_to_db(quiet_rms);

        let band: Vec<f64> = if result.quiet_windows_rms_db > -50.0 {
            (lo..=hi)
                .map(|k| quiet.iter().map(|&i| spectra.window_mag[i][k]).sum::<f64>() / quiet_count as f64)
                .collect()
        } else {
            spectra.avg_mag[lo..=hi].to_vec()
        };

        let hf_db = amplitude_to_db(mean(&band));
        let flatness = spectral_flatness(&band);
        let mut floor = hf_db - spectra.reference_db;
        if flatness < self.noise_flatness_cutoff {
            floor = floor.min(-40.0);
        }
        result.hf_flatness = flatness;
        result.noise_floor_db = floor;
    }
}

/// Frequency of the steepest two-bin drop within 2 kHz of `cutoff`, if steeper than 5 dB
fn steepest_drop(db: &[f64], spectra: &Spectra, cutoff: f64) -> Option<f64> {
    let (lo, hi) = spectra.bins(cutoff - 2000.0, cutoff + 2000.0)?;
    let hi = hi.min(db.len().saturating_sub(3));
    (lo..=hi)
        .map(|k| (k, db[k] - db[k + 2]))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|&(_, drop)| drop > 5.0)
        .map(|(k, _)| k as f64 * spectra.bin_hz)
}

/// Spike of one hum harmonic in dB above its surroundings, or `None` when
/// the peak is not narrow enough to be a tone
fn harmonic_spike(db: &[f64], bin: f64) -> Option<f64> {
    let target = bin.round() as usize;
    if target < 6 || target + 6 >= db.len() {
        return None;
    }
    let peak_bin = (target - 1..=target + 1).max_by(|&a, &b| db[a].total_cmp(&db[b]))?;
    let peak = db[peak_bin];

    let neighbours = db[peak_bin - 2].max(db[peak_bin + 2]);
    if peak - neighbours < 6.0 {
        return None;
    }

    let surround: Vec<f64> = (2..=5)
        .flat_map(|d| [db[peak_bin - d], db[peak_bin + d]])
        .collect();
    Some(peak - mean(&surround))
}
