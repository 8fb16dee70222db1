//! Audio analysis algorithms
//!
//! One streaming analyzer per concern, each consuming a `SampleStream`:
//! - Bit depth authenticity (zero-padded samples)
//! - Clipping (runs of full-scale samples)
//! - DC offset
//! - Truncation (level of the final 50 ms; needs a seekable reader)
//! - Stereo field (correlation, mono fold-down, balance)
//! - Silence segments
//! - Dropouts and glitches
//! - Loudness (BS.1770 / R128) and DR score
//! - True peak and inter-sample peaks
//! - Spectral (fake sample rate, lossy transcode, hum, noise floor)

mod bit_depth;
mod clipping;
mod dc_offset;
mod dropout;
mod loudness;
mod silence;
mod spectral;
mod stereo;
mod true_peak;
mod truncation;

pub use bit_depth::{analyze_bit_depth, BitDepthResult};
pub use clipping::{ChannelClipping, ClippingDetector, ClippingResult};
pub use dc_offset::{analyze_dc_offset, DcOffsetResult};
pub use dropout::{DropoutDetector, DropoutEvent, DropoutKind, DropoutResult};
pub use loudness::{LoudnessAnalyzer, LoudnessResult};
pub use silence::{SilenceDetector, SilenceResult, SilenceSegment};
pub use spectral::{SpectralAnalyzer, SpectralResult};
pub use stereo::{analyze_stereo, StereoResult};
pub use true_peak::{TruePeakAnalyzer, TruePeakResult};
pub use truncation::{TruncationDetector, TruncationResult};
