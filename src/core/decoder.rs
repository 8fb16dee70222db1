// src/core/decoder.rs
//
// Container front-end. Probes a compressed or wrapped audio file with
// Symphonia and extracts its samples as little-endian PCM held in memory,
// ready for the byte-stream analyzers.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::cancel::CancelToken;
use super::format::PcmFormat;
use super::pcm::SampleWidth;
use super::source::MemorySource;
use crate::error::{AnalysisError, Result};

/// Wall-clock budget for extracting one file
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Container facts reported alongside an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: usize,
    /// Depth the container claims; `None` for lossy codecs that carry none
    pub bits_per_sample: Option<u32>,
    pub frames: Option<u64>,
    pub duration_sec: Option<f64>,
}

impl ProbeInfo {
    fn from_params(params: &CodecParameters) -> Result<Self> {
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AnalysisError::MissingRequirement("sample rate".to_string()))?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(0);
        if channels == 0 {
            return Err(AnalysisError::MissingRequirement("channel layout".to_string()));
        }
        let frames = params.n_frames;

        Ok(Self {
            codec: codec_name(params),
            sample_rate,
            channels,
            bits_per_sample: params.bits_per_sample,
            frames,
            duration_sec: frames.map(|n| n as f64 / sample_rate as f64),
        })
    }

    /// Depth the samples are re-encoded at: 32 for 24/32-bit claims, 16 otherwise
    pub fn extraction_depth(&self) -> u32 {
        match self.bits_per_sample {
            Some(bits) if bits >= 24 => 32,
            _ => 16,
        }
    }
}

fn codec_name(params: &CodecParameters) -> String {
    symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|d| d.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", params.codec))
}

/// Extracted PCM plus the format describing it
#[derive(Debug, Clone)]
pub struct DecodedPcm {
    pub format: PcmFormat,
    pub source: MemorySource,
    /// Frames actually decoded
    pub frames: u64,
}

/// An opened and probed container, ready to decode
pub struct ContainerDecoder {
    path: PathBuf,
    reader: Box<dyn FormatReader>,
    track_id: u32,
    params: CodecParameters,
    probe: ProbeInfo,
}

impl ContainerDecoder {
    /// Open and probe a file; no audio is decoded yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AnalysisError::MissingRequirement("audio track".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();
        let probe = ProbeInfo::from_params(&params)?;

        log::debug!(
            "{}: {} {} Hz {} ch, claimed {:?} bits",
            path.display(),
            probe.codec,
            probe.sample_rate,
            probe.channels,
            probe.bits_per_sample
        );

        Ok(Self {
            path,
            reader,
            track_id,
            params,
            probe,
        })
    }

    pub fn probe(&self) -> &ProbeInfo {
        &self.probe
    }

    /// Decode every packet of the track into interleaved LE PCM.
    ///
    /// The token is polled once per packet, so a deadline set with
    /// [`CancelToken::with_timeout`] bounds the extraction.
    pub fn decode(mut self, cancel: &CancelToken) -> Result<DecodedPcm> {
        let depth = self.probe.extraction_depth();
        let width = SampleWidth::from_bits(depth)?;
        let shift = 32 - depth;
        let claimed = match self.probe.bits_per_sample {
            Some(bits) if bits >= 32 => 32,
            Some(bits) if bits >= 24 => 24,
            _ => 16,
        };
        let format = PcmFormat::with_expected(self.probe.sample_rate, depth, self.probe.channels, claimed)?;

        let mut decoder = symphonia::default::get_codecs().make(&self.params, &DecoderOptions::default())?;
        let mut bytes = Vec::new();
        let mut buffer: Option<SampleBuffer<i32>> = None;
        let mut samples = 0u64;

        loop {
            cancel.check()?;
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::warn!("{}: skipping corrupt packet: {}", self.path.display(), msg);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let buf = buffer.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, *decoded.spec()));
            if (buf.capacity() as u64) < decoded.capacity() as u64 * decoded.spec().channels.count() as u64 {
                *buf = SampleBuffer::new(decoded.capacity() as u64, *decoded.spec());
            }
            buf.copy_interleaved_ref(decoded);
            for &s in buf.samples() {
                width.encode(s >> shift, &mut bytes);
            }
            samples += buf.samples().len() as u64;
        }

        if samples == 0 {
            return Err(AnalysisError::MissingRequirement("decoded audio".to_string()));
        }

        let frames = samples / format.channels as u64;
        log::debug!(
            "{}: extracted {} frames at {} bits",
            self.path.display(),
            frames,
            depth
        );

        Ok(DecodedPcm {
            format,
            source: MemorySource::new(bytes),
            frames,
        })
    }
}

/// Probe and extract a file under the default deadline
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<(ProbeInfo, DecodedPcm)> {
    let decoder = ContainerDecoder::open(path)?;
    let probe = decoder.probe().clone();
    let pcm = decoder.decode(&CancelToken::with_timeout(DEFAULT_EXTRACT_TIMEOUT))?;
    Ok((probe, pcm))
}
