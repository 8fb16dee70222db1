// tests/scenarios_test.rs
//
// End-to-end scenarios on synthetic PCM: each one builds a stream with a
// known defect and checks the issue it should raise.

mod test_utils;

use pcmaudit::core::dsp::{amplitude_to_db, FftProcessor, WindowType};
use pcmaudit::{Check, Severity};
use test_utils::*;

#[test]
fn test_digital_silence_is_only_silence_padding() {
    let bytes = encode_ints(&vec![0; 44100 * 5 * 2], 16);
    let result = analyze(bytes, format(44100, 16, 2), "all");

    assert_eq!(result.issues.len(), 17);
    assert_eq!(result.issue_count(), 1, "issues: {:#?}", result.detected().collect::<Vec<_>>());
    let silence = result.issue(Check::SilencePadding).unwrap();
    assert!(silence.detected);
    assert_eq!(silence.severity, Severity::Severe);
    assert_eq!(result.worst_severity(), Severity::Severe);

    let raw = &result.raw;
    assert_eq!(raw.clipping.as_ref().unwrap().events, 0);
    assert!(raw.dc_offset.as_ref().unwrap().offset.abs() < 1e-12);
    let silence = raw.silence.as_ref().unwrap();
    assert!(silence.is_entirely_silent());
    assert!((silence.total_silence_sec - 5.0).abs() < 1e-6);
}

#[test]
fn test_full_scale_is_clipped_with_dc() {
    let bytes = encode_ints(&vec![i16::MAX as i32; 44100], 16);
    let result = analyze(bytes, format(44100, 16, 1), "clipping,dc-offset");

    let clipping = result.issue(Check::Clipping).unwrap();
    assert_eq!(clipping.severity, Severity::Severe);
    assert_eq!(result.raw.clipping.as_ref().unwrap().clipped_samples, 44100);

    let dc = result.raw.dc_offset.as_ref().unwrap();
    assert!((dc.offset - 1.0).abs() < 1e-4);
    assert_eq!(result.issue(Check::DcOffset).unwrap().severity, Severity::Severe);
}

#[test]
fn test_upsampled_content_needs_a_high_rate() {
    // half-band noise: a brick wall at a quarter of the sample rate
    let frames = 88200 * 3;
    let left = lowpass(&white_noise(frames, 1, 0.3), 22050.0, 88200.0, 511);
    let right = lowpass(&white_noise(frames, 2, 0.3), 22050.0, 88200.0, 511);
    let bytes = encode(&interleave(&[left, right]), 16);

    let as_cd = analyze(bytes.clone(), format(44100, 16, 2), "fake-sample-rate");
    assert!(!as_cd.issue(Check::FakeSampleRate).unwrap().detected);
    assert!(!as_cd.raw.spectral.as_ref().unwrap().is_upsampled);

    let as_hires = analyze(bytes, format(88200, 16, 2), "fake-sample-rate");
    let issue = as_hires.issue(Check::FakeSampleRate).unwrap();
    assert!(issue.detected);
    assert_eq!(issue.severity, Severity::Severe);
    let spectral = as_hires.raw.spectral.as_ref().unwrap();
    assert_eq!(spectral.effective_rate, 44100);
    assert!(spectral.upsample_sharpness > 40.0);
}

#[test]
fn test_inverted_channel() {
    let tone = sine(1000.0, 44100.0, 44100, 0.5);
    let left: Vec<i32> = tone.iter().map(|x| (x * 32767.0).round() as i32).collect();
    let mut ints = Vec::with_capacity(left.len() * 2);
    for &l in &left {
        ints.push(l);
        ints.push(-l);
    }
    let result = analyze(encode_ints(&ints, 16), format(44100, 16, 2), "inverted-phase,phase-issues");

    assert!(result.raw.stereo.as_ref().unwrap().correlation < -0.99);
    assert_eq!(result.issue(Check::InvertedPhase).unwrap().severity, Severity::Severe);
    assert_eq!(result.issue(Check::PhaseIssues).unwrap().severity, Severity::Severe);
}

#[test]
fn test_padded_24_bit() {
    let frames = 48000;
    let left = white_noise(frames, 5, 0.5);
    let right = white_noise(frames, 6, 0.5);
    let ints: Vec<i32> = interleave(&[left, right])
        .iter()
        .map(|x| ((x * 32767.0).round() as i32) << 8)
        .collect();
    let result = analyze(encode_ints(&ints, 24), format(48000, 24, 2), "fake-bit-depth");

    let bit_depth = result.raw.bit_depth.as_ref().unwrap();
    assert_eq!(bit_depth.claimed, 24);
    assert_eq!(bit_depth.effective, 16);
    assert!(bit_depth.is_padded);
    assert_eq!(result.issue(Check::FakeBitDepth).unwrap().severity, Severity::Severe);
}

const RATE: f64 = 44100.0;
const FFT: usize = 8192;

/// Mean level (dB) of the bins around 50 Hz that the hum check compares against
fn local_level_db(signal: &[f64], fft: &mut FftProcessor) -> f64 {
    let peak_bin = (50.0 * FFT as f64 / RATE).round() as usize;
    let hop = (signal.len() - FFT) / 40;
    let mut levels = Vec::new();
    for w in 0..40 {
        let mags = fft.magnitude_spectrum(&signal[w * hop..w * hop + FFT]).unwrap();
        let surround: Vec<f64> = (2..=5)
            .flat_map(|d| [mags[peak_bin - d], mags[peak_bin + d]])
            .map(amplitude_to_db)
            .collect();
        levels.push(surround.iter().sum::<f64>() / surround.len() as f64);
    }
    levels.iter().sum::<f64>() / levels.len() as f64
}

/// Pink noise plus a 50 Hz tone whose spectral peak sits 20 dB above the local noise
fn hum_signal(envelope: impl Fn(f64) -> f64) -> Vec<f64> {
    let len = 44100 * 180;
    let noise = pink_noise(len, 42, 0.5);

    let mut fft = FftProcessor::new(FFT, WindowType::Hann);
    let local = local_level_db(&noise, &mut fft);
    let unit = fft.magnitude_spectrum(&sine(50.0, RATE, FFT, 1.0)).unwrap();
    let peak_bin = (50.0 * FFT as f64 / RATE).round() as usize;
    let amplitude = 10f64.powf((local + 20.0 - amplitude_to_db(unit[peak_bin])) / 20.0);

    let signal: Vec<f64> = noise
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let t = i as f64 / RATE;
            n + envelope(t) * amplitude * (2.0 * std::f64::consts::PI * 50.0 * t).sin()
        })
        .collect();
    let peak = signal.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    if peak > 0.95 {
        normalize(signal, 0.95)
    } else {
        signal
    }
}

#[test]
fn test_steady_hum_detected() {
    let bytes = encode(&hum_signal(|_| 1.0), 16);
    let result = analyze(bytes, format(44100, 16, 1), "hum");

    let spectral = result.raw.spectral.as_ref().unwrap();
    assert!(spectral.has_50_hz_hum, "level {} cv {}", spectral.hum_50_hz_db, spectral.hum_50_hz_cv);
    assert!(spectral.hum_50_hz_cv < 0.3);
    assert!(result.issue(Check::Hum).unwrap().detected);
}

#[test]
fn test_modulated_hum_rejected() {
    // tone switches on and off every 3 s, so its level varies across windows
    let bytes = encode(&hum_signal(|t| if (t / 3.0) as u64 % 2 == 0 { 1.0 } else { 0.0 }), 16);
    let result = analyze(bytes, format(44100, 16, 1), "hum");

    let spectral = result.raw.spectral.as_ref().unwrap();
    assert!(!spectral.has_50_hz_hum, "level {} cv {}", spectral.hum_50_hz_db, spectral.hum_50_hz_cv);
    assert!(!result.issue(Check::Hum).unwrap().detected);
}
