// src/config/profiles.rs
//
// Check selection and source-dependent threshold presets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// One named quality check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    Clipping,
    Truncation,
    FakeBitDepth,
    FakeSampleRate,
    LossyTranscode,
    DcOffset,
    FakeStereo,
    PhaseIssues,
    InvertedPhase,
    ChannelImbalance,
    SilencePadding,
    Hum,
    NoiseFloor,
    InterSamplePeaks,
    Loudness,
    DynamicRange,
    Dropouts,
}

impl Check {
    pub const ALL: [Check; 17] = [
        Check::Clipping,
        Check::Truncation,
        Check::FakeBitDepth,
        Check::FakeSampleRate,
        Check::LossyTranscode,
        Check::DcOffset,
        Check::FakeStereo,
        Check::PhaseIssues,
        Check::InvertedPhase,
        Check::ChannelImbalance,
        Check::SilencePadding,
        Check::Hum,
        Check::NoiseFloor,
        Check::InterSamplePeaks,
        Check::Loudness,
        Check::DynamicRange,
        Check::Dropouts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::Clipping => "clipping",
            Check::Truncation => "truncation",
            Check::FakeBitDepth => "fake-bit-depth",
            Check::FakeSampleRate => "fake-sample-rate",
            Check::LossyTranscode => "lossy-transcode",
            Check::DcOffset => "dc-offset",
            Check::FakeStereo => "fake-stereo",
            Check::PhaseIssues => "phase-issues",
            Check::InvertedPhase => "inverted-phase",
            Check::ChannelImbalance => "channel-imbalance",
            Check::SilencePadding => "silence-padding",
            Check::Hum => "hum",
            Check::NoiseFloor => "noise-floor",
            Check::InterSamplePeaks => "inter-sample-peaks",
            Check::Loudness => "loudness",
            Check::DynamicRange => "dynamic-range",
            Check::Dropouts => "dropouts",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Check {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Check::ALL
            .iter()
            .copied()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| AnalysisError::InvalidConfig(format!("unknown check '{}'", s.trim())))
    }
}

/// Set of checks, stored as one bit per `Check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checks(u32);

impl Checks {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Check::ALL.iter().copied().collect()
    }

    /// Defect-oriented subset: everything but the informational measurements
    pub fn defects() -> Self {
        [
            Check::Clipping,
            Check::Truncation,
            Check::FakeBitDepth,
            Check::FakeSampleRate,
            Check::LossyTranscode,
            Check::DcOffset,
            Check::FakeStereo,
            Check::PhaseIssues,
            Check::InvertedPhase,
            Check::SilencePadding,
            Check::Dropouts,
        ]
        .into_iter()
        .collect()
    }

    pub fn contains(self, check: Check) -> bool {
        self.0 & check.bit() != 0
    }

    pub fn insert(&mut self, check: Check) {
        self.0 |= check.bit();
    }

    pub fn with(mut self, check: Check) -> Self {
        self.insert(check);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Selected checks in declaration order
    pub fn iter(self) -> impl Iterator<Item = Check> {
        Check::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl FromIterator<Check> for Checks {
    fn from_iter<I: IntoIterator<Item = Check>>(iter: I) -> Self {
        let mut checks = Checks::none();
        for c in iter {
            checks.insert(c);
        }
        checks
    }
}

impl FromStr for Checks {
    type Err = AnalysisError;

    /// Comma-separated check names; `all` and `defects` expand to their presets
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut checks = Checks::none();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "all" => checks.0 |= Checks::all().0,
                "defects" => checks.0 |= Checks::defects().0,
                _ => checks.insert(part.parse()?),
            }
        }
        if checks.is_empty() {
            return Err(AnalysisError::InvalidConfig("no checks selected".to_string()));
        }
        Ok(checks)
    }
}

impl fmt::Display for Checks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Check::name).collect();
        f.write_str(&names.join(","))
    }
}

/// Where the audio came from; selects a threshold preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Studio or digitally produced material (strictest thresholds)
    #[default]
    Digital,
    /// Vinyl rips: surface noise, rumble and hum are expected
    Vinyl,
    /// Live recordings: wider dynamics and room noise
    Live,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Digital => "digital",
            Source::Vinyl => "vinyl",
            Source::Live => "live",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "digital" => Ok(Source::Digital),
            "vinyl" => Ok(Source::Vinyl),
            "live" => Ok(Source::Live),
            other => Err(AnalysisError::InvalidConfig(format!(
                "unknown source '{}' (expected digital, vinyl or live)",
                other
            ))),
        }
    }
}

/// Numeric knobs used by scoring and by the analyzers' parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum |DC offset| reported as an issue
    pub dc_offset: f64,
    /// Minimum mean hum spike (dB) reported as an issue
    pub hum_min_db: f64,
    /// HF level relative to the reference above which the noise floor is flagged
    pub noise_floor_db: f64,
    /// Silence detector level
    pub silence_threshold_db: f64,
    /// Minimum leading or trailing silence (seconds) reported as padding
    pub silence_min_sec: f64,
    /// DR score at or below which dynamic range is flagged
    pub dr_max: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::digital()
    }
}

impl Thresholds {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Digital => Self::digital(),
            Source::Vinyl => Self::vinyl(),
            Source::Live => Self::live(),
        }
    }

    fn digital() -> Self {
        Self {
            dc_offset: 0.001,
            hum_min_db: 15.0,
            noise_floor_db: -30.0,
            silence_threshold_db: -60.0,
            silence_min_sec: 2.0,
            dr_max: 7,
        }
    }

    fn vinyl() -> Self {
        Self {
            dc_offset: 0.005,
            hum_min_db: 25.0,
            noise_floor_db: -20.0,
            silence_threshold_db: -50.0,
            silence_min_sec: 4.0,
            ..Self::digital()
        }
    }

    fn live() -> Self {
        Self {
            noise_floor_db: -24.0,
            dr_max: 5,
            ..Self::digital()
        }
    }
}
