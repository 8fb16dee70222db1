//! Core analysis: PCM decoding, analyzers, DSP utilities and orchestration

pub mod analysis;
pub mod analyzer;
pub mod cancel;
pub mod decoder;
pub mod dsp;
pub mod format;
pub mod pcm;
pub mod source;

pub use analyzer::{AnalyzerBuilder, AnalyzerKind, AudioAnalyzer, Options, PcmAnalyzer, RawAnalysis};
pub use cancel::CancelToken;
pub use decoder::{decode_file, ContainerDecoder, DecodedPcm, ProbeInfo, DEFAULT_EXTRACT_TIMEOUT};
pub use format::PcmFormat;
pub use pcm::{SampleStream, SampleWidth};
pub use source::{ByteSource, FileSource, MemorySource, ReadSeek};
