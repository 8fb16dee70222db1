//! pcmaudit - Offline quality audit for PCM audio
//!
//! Reads raw little-endian PCM (16, 24 or 32-bit, interleaved) from a
//! restartable byte source and runs up to seventeen quality checks over it:
//! clipping, truncation, fake bit depth, fake sample rate, lossy transcode,
//! DC offset, fake stereo, phase problems, channel imbalance, silence padding,
//! hum, noise floor, inter-sample peaks, loudness, dynamic range and dropouts.
//!
//! ## Module Structure
//!
//! - `core` - PCM decoding, streaming analyzers, DSP utilities, orchestration
//! - `config` - Check selection and per-source thresholds
//! - `detection` - Issue scoring and result types
//! - `cli` - Command-line interface (analyze, process, report, digest)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pcmaudit::{AudioAnalyzer, Checks, FileSource, PcmFormat, Source};
//!
//! let format = PcmFormat::new(44100, 16, 2)?;
//! let analyzer = AudioAnalyzer::builder()
//!     .checks(Checks::defects())
//!     .source(Source::Vinyl)
//!     .build();
//!
//! let result = analyzer.analyze(&FileSource::new("track.pcm"), format)?;
//! for issue in result.detected() {
//!     println!("{} {}: {}", issue.severity.symbol(), issue.check, issue.summary);
//! }
//! # Ok::<(), pcmaudit::AnalysisError>(())
//! ```
//!
//! ## Sources
//!
//! | Source  | Key adjustments                                   |
//! |---------|---------------------------------------------------|
//! | Digital | Strict defaults                                   |
//! | Vinyl   | Tolerates hum, surface noise, DC and lead-in gaps |
//! | Live    | Tolerates compressed dynamics and room noise      |

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Check selection and thresholds
pub mod config;

// Scoring and result types
pub mod detection;

pub mod error;

pub use config::{Check, Checks, Source, Thresholds};
pub use core::{
    AnalyzerBuilder, AudioAnalyzer, ByteSource, CancelToken, FileSource, MemorySource, Options,
    PcmFormat,
};
pub use detection::{AnalysisResult, Issue, RawResults, Severity};
pub use error::{AnalysisError, Result};
