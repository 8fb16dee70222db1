//! Scoring: turn raw analyzer outputs into severity-classified issues
//!
//! Scoring is a pure function of `RawResults`, the selected `Checks` and the
//! `Thresholds`, so a result read back from JSON scores identically.

use crate::config::{Check, Checks, Thresholds};

use super::result::{AnalysisResult, Issue, RawResults, Severity};

/// How far `value` has moved from `threshold` toward `next`, clamped to [0, 1]
fn ramp(value: f64, threshold: f64, next: f64) -> f64 {
    let span = next - threshold;
    if span <= 0.0 {
        return 1.0;
    }
    ((value - threshold) / span).clamp(0.0, 1.0)
}

/// Severity for a value where larger is worse
fn banded(value: f64, moderate_at: f64, severe_at: f64) -> Severity {
    if value >= severe_at {
        Severity::Severe
    } else if value >= moderate_at {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

/// Score every selected check that has its raw result available
pub fn score(raw: &RawResults, checks: Checks, thresholds: &Thresholds) -> Vec<Issue> {
    checks
        .iter()
        .filter_map(|check| score_check(check, raw, thresholds))
        .collect()
}

/// Score and wrap into an `AnalysisResult`
pub fn build_result(raw: RawResults, checks: Checks, thresholds: &Thresholds) -> AnalysisResult {
    let issues = score(&raw, checks, thresholds);
    AnalysisResult::new(issues, raw)
}

fn score_check(check: Check, raw: &RawResults, t: &Thresholds) -> Option<Issue> {
    let issue = match check {
        Check::Clipping => {
            let r = raw.clipping.as_ref()?;
            if r.events > 0 {
                let clipped = r.clipped_samples as f64;
                Issue::detected(
                    check,
                    banded(clipped, 100.0, 1000.0),
                    ramp(clipped, 0.0, 100.0),
                    format!(
                        "{} clipping events, {} samples at full scale (longest run {})",
                        r.events, r.clipped_samples, r.longest_run
                    ),
                )
            } else {
                Issue::clean(check, "No clipping")
            }
        }

        Check::Truncation => {
            let r = raw.truncation.as_ref()?;
            if r.final_rms_db > -40.0 && r.final_peak_db > -35.0 {
                Issue::detected(
                    check,
                    banded(r.final_rms_db, -30.0, -20.0),
                    ramp(r.final_rms_db, -40.0, -30.0),
                    format!(
                        "Ends abruptly: final {:.0} ms at {:.1} dB RMS, {:.1} dB peak",
                        r.window_ms, r.final_rms_db, r.final_peak_db
                    ),
                )
            } else {
                Issue::clean(check, format!("Fades out ({:.1} dB RMS at the end)", r.final_rms_db))
            }
        }

        Check::FakeBitDepth => {
            let r = raw.bit_depth.as_ref()?;
            if r.is_padded {
                let severity = if r.effective <= 16 { Severity::Severe } else { Severity::Mild };
                Issue::detected(
                    check,
                    severity,
                    1.0,
                    format!("Claims {}-bit but only {} bits are used", r.claimed, r.effective),
                )
            } else {
                Issue::clean(check, format!("{}-bit content is genuine", r.effective))
            }
        }

        Check::FakeSampleRate => {
            let r = raw.spectral.as_ref()?;
            if r.is_upsampled {
                Issue::detected(
                    check,
                    Severity::Severe,
                    1.0,
                    format!(
                        "Upsampled from {} Hz: brick wall at {:.0} Hz ({:.0} dB/oct)",
                        r.effective_rate, r.upsample_cutoff, r.upsample_sharpness
                    ),
                )
            } else {
                Issue::clean(check, "No upsampling cutoff found")
            }
        }

        Check::LossyTranscode => {
            let r = raw.spectral.as_ref()?;
            if r.is_transcode {
                let severity = if r.transcode_confidence >= 0.85 {
                    Severity::Severe
                } else if r.transcode_confidence >= 0.65 {
                    Severity::Moderate
                } else {
                    Severity::Mild
                };
                Issue::detected(
                    check,
                    severity,
                    r.transcode_confidence,
                    format!(
                        "Lowpass at {:.0} Hz typical of {}",
                        r.transcode_cutoff,
                        r.transcode_codec.as_deref().unwrap_or("a lossy encoder")
                    ),
                )
            } else {
                Issue::clean(check, "No lossy encoder cutoff found")
            }
        }

        Check::DcOffset => {
            let r = raw.dc_offset.as_ref()?;
            if r.offset > t.dc_offset {
                Issue::detected(
                    check,
                    banded(r.offset, 0.01, 0.05),
                    ramp(r.offset, t.dc_offset, 0.01),
                    format!("DC offset {:.4} ({:.1} dB)", r.offset, r.offset_db),
                )
            } else {
                Issue::clean(check, format!("DC offset {:.5}", r.offset))
            }
        }

        Check::FakeStereo => {
            let r = raw.stereo.as_ref()?;
            if !r.valid {
                Issue::clean(check, "Not a stereo stream")
            } else if r.correlation > 0.98 && r.difference_db < -60.0 {
                let severity = if r.difference_db < -80.0 { Severity::Severe } else { Severity::Moderate };
                Issue::detected(
                    check,
                    severity,
                    ramp(-r.difference_db, 60.0, 80.0),
                    format!(
                        "Channels are identical (correlation {:.4}, L-R at {:.1} dB)",
                        r.correlation, r.difference_db
                    ),
                )
            } else {
                Issue::clean(check, format!("Correlation {:.3}", r.correlation))
            }
        }

        Check::PhaseIssues => {
            let r = raw.stereo.as_ref()?;
            if r.valid && r.cancellation_db > 3.0 {
                Issue::detected(
                    check,
                    banded(r.cancellation_db, 6.0, 9.0),
                    ramp(r.cancellation_db, 3.0, 6.0),
                    format!("Mono fold-down loses {:.1} dB", r.cancellation_db),
                )
            } else {
                Issue::clean(check, "Mono compatible")
            }
        }

        Check::InvertedPhase => {
            let r = raw.stereo.as_ref()?;
            if r.valid && r.correlation < -0.9 {
                let severity = if r.correlation < -0.95 { Severity::Severe } else { Severity::Moderate };
                Issue::detected(
                    check,
                    severity,
                    ramp(-r.correlation, 0.9, 0.95),
                    format!("One channel is polarity inverted (correlation {:.3})", r.correlation),
                )
            } else {
                Issue::clean(check, "Polarity consistent")
            }
        }

        Check::ChannelImbalance => {
            let r = raw.stereo.as_ref()?;
            let imbalance = r.imbalance_db.abs();
            if r.valid && imbalance > 1.0 {
                let louder = if r.imbalance_db > 0.0 { "left" } else { "right" };
                Issue::detected(
                    check,
                    banded(imbalance, 2.0, 3.0),
                    ramp(imbalance, 1.0, 2.0),
                    format!("{} channel is {:.1} dB louder", louder, imbalance),
                )
            } else {
                Issue::clean(check, "Channels balanced")
            }
        }

        Check::SilencePadding => {
            let r = raw.silence.as_ref()?;
            let longest = r.leading_sec.max(r.trailing_sec);
            if r.is_entirely_silent() {
                Issue::detected(
                    check,
                    Severity::Severe,
                    1.0,
                    format!("Entirely silent ({:.1} s)", r.duration_sec),
                )
            } else if longest >= t.silence_min_sec {
                Issue::detected(
                    check,
                    banded(longest, 5.0, 15.0),
                    ramp(longest, t.silence_min_sec, 5.0),
                    format!(
                        "{:.1} s leading and {:.1} s trailing silence",
                        r.leading_sec, r.trailing_sec
                    ),
                )
            } else {
                Issue::clean(check, "No silence padding")
            }
        }

        Check::Hum => {
            let r = raw.spectral.as_ref()?;
            let level = r.hum_level_db();
            if (r.has_50_hz_hum || r.has_60_hz_hum) && level >= t.hum_min_db {
                let mains = match (r.has_50_hz_hum, r.has_60_hz_hum) {
                    (true, true) => "50/60 Hz",
                    (true, false) => "50 Hz",
                    _ => "60 Hz",
                };
                Issue::detected(
                    check,
                    banded(level, 20.0, 30.0),
                    ramp(level, t.hum_min_db, 20.0),
                    format!("{} mains hum {:.1} dB above the surrounding spectrum", mains, level),
                )
            } else {
                Issue::clean(check, "No mains hum")
            }
        }

        Check::NoiseFloor => {
            let r = raw.spectral.as_ref()?;
            if r.windows_analyzed > 0 && r.noise_floor_db > t.noise_floor_db {
                Issue::detected(
                    check,
                    banded(r.noise_floor_db, -20.0, -10.0),
                    ramp(r.noise_floor_db, t.noise_floor_db, -20.0),
                    format!(
                        "High-frequency noise {:.1} dB relative to program level",
                        r.noise_floor_db
                    ),
                )
            } else {
                Issue::clean(check, format!("Noise floor {:.1} dB", r.noise_floor_db))
            }
        }

        Check::InterSamplePeaks => {
            let r = raw.true_peak.as_ref()?;
            if r.isp_count > 0 {
                let count = r.isp_count as f64;
                Issue::detected(
                    check,
                    banded(count, 100.0, 1000.0),
                    ramp(count, 0.0, 100.0),
                    format!(
                        "{} inter-sample peaks, true peak {:+.2} dBTP",
                        r.isp_count, r.true_peak_db
                    ),
                )
            } else {
                Issue::clean(check, format!("True peak {:+.2} dBTP", r.true_peak_db))
            }
        }

        Check::Loudness => {
            let r = raw.loudness.as_ref()?;
            let lufs = r.integrated_lufs;
            let measurable = lufs > -120.0;
            let text = format!("Integrated {:.1} LUFS, LRA {:.1} LU", lufs, r.loudness_range_lu);
            if measurable && lufs > -9.0 {
                let severity = if lufs <= -7.0 {
                    Severity::Mild
                } else if lufs <= -5.0 {
                    Severity::Moderate
                } else {
                    Severity::Severe
                };
                Issue::detected(check, severity, ramp(lufs, -9.0, -7.0), format!("Too loud: {}", text))
            } else if measurable && lufs < -30.0 {
                let severity = if lufs >= -35.0 {
                    Severity::Mild
                } else if lufs >= -40.0 {
                    Severity::Moderate
                } else {
                    Severity::Severe
                };
                Issue::detected(check, severity, ramp(-lufs, 30.0, 35.0), format!("Too quiet: {}", text))
            } else if measurable {
                Issue::clean(check, text)
            } else {
                Issue::clean(check, "Loudness not measurable (silent)")
            }
        }

        Check::DynamicRange => {
            let r = raw.loudness.as_ref()?;
            if r.dr_score > 0 && r.dr_score <= t.dr_max {
                let severity = match r.dr_score {
                    0..=4 => Severity::Severe,
                    5 | 6 => Severity::Moderate,
                    _ => Severity::Mild,
                };
                Issue::detected(
                    check,
                    severity,
                    ramp(-(r.dr_score as f64), -(t.dr_max as f64 + 1.0), -4.0),
                    format!("DR{} ({:.1} dB crest factor)", r.dr_score, r.dr_value),
                )
            } else if r.dr_score > 0 {
                Issue::clean(check, format!("DR{}", r.dr_score))
            } else {
                Issue::clean(check, "Dynamic range not measurable (silent)")
            }
        }

        Check::Dropouts => {
            let r = raw.dropouts.as_ref()?;
            if r.total_events > 0 {
                let severity = if r.total_events >= 10 || r.worst_db >= -1.0 {
                    Severity::Severe
                } else if r.total_events >= 3 || r.worst_db >= -3.0 {
                    Severity::Moderate
                } else {
                    Severity::Mild
                };
                Issue::detected(
                    check,
                    severity,
                    ramp(r.total_events as f64, 0.0, 3.0),
                    format!(
                        "{} dropouts ({} jumps, {} zero runs, {} DC steps)",
                        r.total_events, r.delta_events, r.zero_run_events, r.dc_jump_events
                    ),
                )
            } else {
                Issue::clean(check, "No dropouts")
            }
        }
    };
    Some(issue)
}
