//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{Check, Checks, Source};

/// Offline quality audit for PCM audio
#[derive(Parser, Debug)]
#[command(name = "pcmaudit")]
#[command(version)]
#[command(about = "Detect clipping, fake bit depth, fake sample rate, transcodes and other defects in PCM audio")]
pub struct Cli {
    /// Debug logging (otherwise RUST_LOG or warnings only)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze raw little-endian PCM from a file or stdin
    Analyze(AnalyzeArgs),
    /// Decode an audio container and analyze its samples
    Process(ProcessArgs),
    /// Analyze every audio file below a folder and write JSONL
    Report(ReportArgs),
    /// Summarize a JSONL report
    Digest(DigestArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

/// Check selection shared by the analyzing subcommands
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Comma-separated checks, or `all` / `defects`
    #[arg(long, default_value = "all")]
    pub checks: Checks,

    /// Recording source; loosens thresholds for vinyl and live material
    #[arg(long, default_value = "digital")]
    pub source: Source,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// PCM file, or `-` for stdin
    pub input: String,

    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Bits per sample in the stream (16, 24 or 32)
    #[arg(long, default_value_t = 16)]
    pub bit_depth: u32,

    #[arg(long, default_value_t = 2)]
    pub channels: usize,

    /// Depth the source claims, if different from the stream depth
    #[arg(long)]
    pub expected_bit_depth: Option<u32>,

    #[command(flatten)]
    pub checks: CheckArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Audio file (FLAC, WAV, AIFF, MP3, ...)
    pub input: PathBuf,

    #[command(flatten)]
    pub checks: CheckArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Folder to scan recursively
    pub folder: PathBuf,

    /// Replace file paths with an MD5 of the relative path
    #[arg(long)]
    pub redact_path: bool,

    #[command(flatten)]
    pub checks: CheckArgs,

    /// Worker threads (default: number of CPUs)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Write JSONL here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// JSONL written by `report`
    pub report: PathBuf,

    /// List the files where this check was detected
    #[arg(long)]
    pub issue: Option<Check>,
}
