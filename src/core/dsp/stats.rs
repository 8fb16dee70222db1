//! Statistical and spectral helper functions

/// Floor for every dB value reported by the analyzers
pub const MIN_DB: f64 = -120.0;

/// Convert a linear amplitude to dB (relative to 1.0), floored at `MIN_DB`
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        (20.0 * amplitude.log10()).max(MIN_DB)
    } else {
        MIN_DB
    }
}

/// Convert dB to a linear amplitude
pub fn db_to_amplitude(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Root mean square of a slice
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Peak absolute value
pub fn peak_amplitude(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s.abs()).fold(0.0, f64::max)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Nearest-rank percentile of an ascending-sorted slice (`p` in 0..=100)
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Spectral flatness (Wiener entropy) of linear magnitudes.
/// Returns 1.0 for white noise, approaches 0.0 for tonal signals, and 0.0
/// for an all-zero band.
pub fn spectral_flatness(magnitudes: &[f64]) -> f64 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let n = magnitudes.len() as f64;
    let arithmetic_mean = magnitudes.iter().sum::<f64>() / n;
    if arithmetic_mean < 1e-12 {
        return 0.0;
    }
    let log_sum: f64 = magnitudes.iter().map(|&m| (m + 1e-12).ln()).sum();
    let geometric_mean = (log_sum / n).exp();
    (geometric_mean / arithmetic_mean).min(1.0)
}

/// Magnitude-weighted mean frequency; `bin_hz` is the width of one bin
pub fn spectral_centroid(magnitudes: &[f64], bin_hz: f64) -> f64 {
    let total: f64 = magnitudes.iter().sum();
    if total < 1e-12 {
        return 0.0;
    }
    let weighted: f64 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| i as f64 * bin_hz * m)
        .sum();
    weighted / total
}
