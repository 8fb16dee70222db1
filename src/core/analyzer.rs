// src/core/analyzer.rs
//
// High-level analysis API with builder pattern. Runs each selected analyzer
// on a fresh reader from a restartable byte source, then scores the raw
// results.

use std::time::Instant;

use super::analysis::{
    analyze_bit_depth, analyze_dc_offset, analyze_stereo, ClippingDetector, DropoutDetector,
    LoudnessAnalyzer, SilenceDetector, SpectralAnalyzer, TruePeakAnalyzer, TruncationDetector,
};
use super::analysis::{
    BitDepthResult, ClippingResult, DcOffsetResult, DropoutResult, LoudnessResult, SilenceResult,
    SpectralResult, StereoResult, TruePeakResult, TruncationResult,
};
use super::cancel::CancelToken;
use super::format::PcmFormat;
use super::pcm::SampleStream;
use super::source::{ByteSource, ReadSeek};
use crate::config::{Check, Checks, Source, Thresholds};
use crate::detection::{build_result, AnalysisResult, RawResults};
use crate::error::Result;

/// The analyzers a check can need. Several checks share one analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnalyzerKind {
    Clipping,
    Truncation,
    BitDepth,
    Spectral,
    DcOffset,
    Stereo,
    Silence,
    TruePeak,
    Loudness,
    Dropout,
}

impl AnalyzerKind {
    pub fn for_check(check: Check) -> Self {
        match check {
            Check::Clipping => Self::Clipping,
            Check::Truncation => Self::Truncation,
            Check::FakeBitDepth => Self::BitDepth,
            Check::FakeSampleRate | Check::LossyTranscode | Check::Hum | Check::NoiseFloor => {
                Self::Spectral
            }
            Check::DcOffset => Self::DcOffset,
            Check::FakeStereo | Check::PhaseIssues | Check::InvertedPhase | Check::ChannelImbalance => {
                Self::Stereo
            }
            Check::SilencePadding => Self::Silence,
            Check::InterSamplePeaks => Self::TruePeak,
            Check::Loudness | Check::DynamicRange => Self::Loudness,
            Check::Dropouts => Self::Dropout,
        }
    }

    /// Distinct analyzers for a check set, each listed once
    pub fn for_checks(checks: Checks) -> Vec<Self> {
        let mut kinds: Vec<Self> = checks.iter().map(Self::for_check).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clipping => "clipping",
            Self::Truncation => "truncation",
            Self::BitDepth => "bit-depth",
            Self::Spectral => "spectral",
            Self::DcOffset => "dc-offset",
            Self::Stereo => "stereo",
            Self::Silence => "silence",
            Self::TruePeak => "true-peak",
            Self::Loudness => "loudness",
            Self::Dropout => "dropout",
        }
    }

    /// Instantiate the analyzer with source-dependent parameters
    pub fn build(self, thresholds: &Thresholds) -> Box<dyn PcmAnalyzer> {
        match self {
            Self::Clipping => Box::new(ClippingDetector::new()),
            Self::Truncation => Box::new(TruncationDetector::new()),
            Self::BitDepth => Box::new(BitDepthAnalyzer),
            Self::Spectral => Box::new(SpectralAnalyzer::new()),
            Self::DcOffset => Box::new(DcOffsetAnalyzer),
            Self::Stereo => Box::new(StereoAnalyzer),
            Self::Silence => Box::new(
                SilenceDetector::new().with_threshold_db(thresholds.silence_threshold_db),
            ),
            Self::TruePeak => Box::new(TruePeakAnalyzer::new()),
            Self::Loudness => Box::new(LoudnessAnalyzer::new()),
            Self::Dropout => Box::new(DropoutDetector::new()),
        }
    }
}

/// Output of one analyzer run
#[derive(Debug, Clone, PartialEq)]
pub enum RawAnalysis {
    Clipping(ClippingResult),
    Truncation(TruncationResult),
    BitDepth(BitDepthResult),
    Spectral(SpectralResult),
    DcOffset(DcOffsetResult),
    Stereo(StereoResult),
    Silence(SilenceResult),
    TruePeak(TruePeakResult),
    Loudness(LoudnessResult),
    Dropout(DropoutResult),
}

impl RawAnalysis {
    /// Move this result into its slot
    pub fn store(self, raw: &mut RawResults) {
        match self {
            Self::Clipping(r) => raw.clipping = Some(r),
            Self::Truncation(r) => raw.truncation = Some(r),
            Self::BitDepth(r) => raw.bit_depth = Some(r),
            Self::Spectral(r) => raw.spectral = Some(r),
            Self::DcOffset(r) => raw.dc_offset = Some(r),
            Self::Stereo(r) => raw.stereo = Some(r),
            Self::Silence(r) => raw.silence = Some(r),
            Self::TruePeak(r) => raw.true_peak = Some(r),
            Self::Loudness(r) => raw.loudness = Some(r),
            Self::Dropout(r) => raw.dropouts = Some(r),
        }
    }
}

/// An analyzer consumes one reader to EOF and returns its raw result
pub trait PcmAnalyzer: Send + Sync {
    fn run(
        &self,
        reader: Box<dyn ReadSeek>,
        format: PcmFormat,
        cancel: &CancelToken,
    ) -> Result<RawAnalysis>;
}

fn stream(reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<SampleStream<Box<dyn ReadSeek>>> {
    SampleStream::new(reader, format, cancel.clone())
}

struct BitDepthAnalyzer;
struct DcOffsetAnalyzer;
struct StereoAnalyzer;

impl PcmAnalyzer for BitDepthAnalyzer {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        analyze_bit_depth(&mut stream(reader, format, cancel)?).map(RawAnalysis::BitDepth)
    }
}

impl PcmAnalyzer for DcOffsetAnalyzer {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        analyze_dc_offset(&mut stream(reader, format, cancel)?).map(RawAnalysis::DcOffset)
    }
}

impl PcmAnalyzer for StereoAnalyzer {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        analyze_stereo(&mut stream(reader, format, cancel)?).map(RawAnalysis::Stereo)
    }
}

impl PcmAnalyzer for ClippingDetector {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(&mut stream(reader, format, cancel)?).map(RawAnalysis::Clipping)
    }
}

impl PcmAnalyzer for TruncationDetector {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(reader, format, cancel.clone()).map(RawAnalysis::Truncation)
    }
}

impl PcmAnalyzer for SpectralAnalyzer {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(&mut stream(reader, format, cancel)?).map(RawAnalysis::Spectral)
    }
}

impl PcmAnalyzer for SilenceDetector {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(&mut stream(reader, format, cancel)?).map(RawAnalysis::Silence)
    }
}

impl PcmAnalyzer for TruePeakAnalyzer {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(&mut stream(reader, format, cancel)?).map(RawAnalysis::TruePeak)
    }
}

impl PcmAnalyzer for LoudnessAnalyzer {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(&mut stream(reader, format, cancel)?).map(RawAnalysis::Loudness)
    }
}

impl PcmAnalyzer for DropoutDetector {
    fn run(&self, reader: Box<dyn ReadSeek>, format: PcmFormat, cancel: &CancelToken) -> Result<RawAnalysis> {
        self.analyze(&mut stream(reader, format, cancel)?).map(RawAnalysis::Dropout)
    }
}

/// What to check and against which thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    pub checks: Checks,
    pub source: Source,
    pub thresholds: Thresholds,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            checks: Checks::all(),
            source: Source::Digital,
            thresholds: Thresholds::for_source(Source::Digital),
        }
    }
}

/// Builder for AudioAnalyzer configuration
pub struct AnalyzerBuilder {
    options: Options,
    cancel: CancelToken,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn checks(mut self, checks: Checks) -> Self {
        self.options.checks = checks;
        self
    }

    /// Select a source; also resets the thresholds to that source's preset
    pub fn source(mut self, source: Source) -> Self {
        self.options.source = source;
        self.options.thresholds = Thresholds::for_source(source);
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.options.thresholds = thresholds;
        self
    }

    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> AudioAnalyzer {
        AudioAnalyzer {
            options: self.options,
            cancel: self.cancel,
        }
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the analyzers needed by the selected checks, one after another
pub struct AudioAnalyzer {
    options: Options,
    cancel: CancelToken,
}

impl Default for AudioAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioAnalyzer {
    /// Analyzer running every check with digital thresholds
    pub fn new() -> Self {
        AnalyzerBuilder::new().build()
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run the analyzers and return their raw results unscored
    pub fn analyze_raw(&self, source: &dyn ByteSource, format: PcmFormat) -> Result<RawResults> {
        format.validate()?;
        let mut raw = RawResults::default();

        for kind in AnalyzerKind::for_checks(self.options.checks) {
            self.cancel.check()?;
            let analyzer = kind.build(&self.options.thresholds);
            let reader = source.open()?;
            let started = Instant::now();
            let result = analyzer.run(reader, format, &self.cancel)?;
            log::debug!(
                "{}: {} analyzer finished in {:.1} ms",
                source.describe(),
                kind.name(),
                started.elapsed().as_secs_f64() * 1000.0
            );
            result.store(&mut raw);
        }
        Ok(raw)
    }

    /// Run the analyzers and score their results
    pub fn analyze(&self, source: &dyn ByteSource, format: PcmFormat) -> Result<AnalysisResult> {
        let raw = self.analyze_raw(source, format)?;
        Ok(build_result(raw, self.options.checks, &self.options.thresholds))
    }
}
