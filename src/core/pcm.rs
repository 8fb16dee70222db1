// src/core/pcm.rs
//
// Bit-exact decoding of little-endian signed PCM and the chunked sample
// stream every analyzer consumes.

use std::io::{ErrorKind, Read};

use super::cancel::CancelToken;
use super::format::PcmFormat;
use crate::error::{AnalysisError, Result};

/// Frames decoded per chunk by `SampleStream`
const CHUNK_FRAMES: usize = 4096;

/// Width of one little-endian sample on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    I16,
    I24,
    I32,
}

impl SampleWidth {
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            16 => Ok(Self::I16),
            24 => Ok(Self::I24),
            32 => Ok(Self::I32),
            other => Err(AnalysisError::InvalidConfig(format!(
                "unsupported bit depth {}",
                other
            ))),
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Self::I16 => 2,
            Self::I24 => 3,
            Self::I32 => 4,
        }
    }

    /// Decode one sample. `bytes` must hold at least `self.bytes()` bytes.
    #[inline]
    pub fn decode(self, bytes: &[u8]) -> i32 {
        match self {
            Self::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
            Self::I24 => {
                let mut v = bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16;
                if v & 0x0080_0000 != 0 {
                    v |= 0xFF00_0000;
                }
                v as i32
            }
            Self::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Append one sample in little-endian order (the value must fit the width)
    pub fn encode(self, value: i32, out: &mut Vec<u8>) {
        let le = value.to_le_bytes();
        out.extend_from_slice(&le[..self.bytes()]);
    }
}

/// Iterate whole frames of `bytes` as normalized `f64` samples.
///
/// Trailing bytes that do not form a complete frame are ignored.
pub fn frames<'a>(
    bytes: &'a [u8],
    format: &PcmFormat,
) -> Result<impl Iterator<Item = Vec<f64>> + 'a> {
    format.validate()?;
    let width = SampleWidth::from_bits(format.bit_depth)?;
    let scale = format.scale();
    Ok(bytes.chunks_exact(format.frame_bytes()).map(move |frame| {
        frame
            .chunks_exact(width.bytes())
            .map(|s| width.decode(s) as f64 / scale)
            .collect()
    }))
}

/// Chunked reader turning a byte stream into interleaved integer samples.
///
/// Each call to `next_chunk` yields whole frames only; a partial frame at
/// end of stream is discarded. The cancellation token is polled before every
/// chunk.
pub struct SampleStream<R: Read> {
    reader: R,
    format: PcmFormat,
    width: SampleWidth,
    cancel: CancelToken,
    bytes: Vec<u8>,
    filled: usize,
    samples: Vec<i32>,
    eof: bool,
    frames_read: u64,
}

impl<R: Read> SampleStream<R> {
    pub fn new(reader: R, format: PcmFormat, cancel: CancelToken) -> Result<Self> {
        format.validate()?;
        let width = SampleWidth::from_bits(format.bit_depth)?;
        Ok(Self {
            reader,
            format,
            width,
            cancel,
            bytes: vec![0u8; CHUNK_FRAMES * format.frame_bytes()],
            filled: 0,
            samples: Vec::with_capacity(CHUNK_FRAMES * format.channels),
            eof: false,
            frames_read: 0,
        })
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    /// Frames returned so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next block of interleaved integer samples, or `None` at end of stream
    pub fn next_chunk(&mut self) -> Result<Option<&[i32]>> {
        self.cancel.check()?;

        while self.filled < self.bytes.len() && !self.eof {
            match self.reader.read(&mut self.bytes[self.filled..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let frame_bytes = self.format.frame_bytes();
        let whole = self.filled / frame_bytes * frame_bytes;
        if whole == 0 {
            return Ok(None);
        }

        self.samples.clear();
        let width = self.width;
        self.samples.extend(
            self.bytes[..whole]
                .chunks_exact(width.bytes())
                .map(|s| width.decode(s)),
        );
        self.bytes.copy_within(whole..self.filled, 0);
        self.filled -= whole;
        self.frames_read += (whole / frame_bytes) as u64;

        Ok(Some(&self.samples))
    }
}
