// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod digest;
mod output;
mod report;

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};

pub use args::{AnalyzeArgs, CheckArgs, Cli, Command, DigestArgs, OutputFormat, ProcessArgs, ReportArgs};
pub use digest::{Digest, Hit};
pub use output::{format_markdown, format_text, render};
pub use report::{analyze_file, collect_audio_files, display_name, ReportLine, Timing, AUDIO_EXTENSIONS};

use crate::core::{decode_file, AudioAnalyzer, FileSource, MemorySource, PcmFormat};

/// Run the parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => analyze(&args, cli.verbose),
        Command::Process(args) => process(&args, cli.verbose),
        Command::Report(args) => report::run(&args),
        Command::Digest(args) => digest::run(&args),
    }
}

fn analyzer(checks: &CheckArgs) -> AudioAnalyzer {
    AudioAnalyzer::builder()
        .checks(checks.checks)
        .source(checks.source)
        .build()
}

fn analyze(args: &AnalyzeArgs, verbose: bool) -> Result<()> {
    let format = PcmFormat::with_expected(
        args.sample_rate,
        args.bit_depth,
        args.channels,
        args.expected_bit_depth.unwrap_or(args.bit_depth),
    )
    .context("Invalid PCM format")?;
    let analyzer = analyzer(&args.checks);

    let result = if args.input == "-" {
        // stdin cannot be reopened or seeked, so buffer it
        let mut bytes = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Failed to read PCM from stdin")?;
        analyzer.analyze(&MemorySource::new(bytes), format)
    } else {
        let path = Path::new(&args.input);
        if !path.is_file() {
            anyhow::bail!("No such file: {}", path.display());
        }
        analyzer.analyze(&FileSource::new(path), format)
    }
    .with_context(|| format!("Failed to analyze {}", args.input))?;

    let label = if args.input == "-" { "<stdin>" } else { args.input.as_str() };
    println!("{}", render(label, &result, args.format, verbose)?);
    Ok(())
}

fn process(args: &ProcessArgs, verbose: bool) -> Result<()> {
    let (probe, pcm) = decode_file(&args.input)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;
    log::info!(
        "{}: {} frames of {} at {} Hz",
        args.input.display(),
        pcm.frames,
        probe.codec,
        probe.sample_rate
    );

    let result = analyzer(&args.checks)
        .analyze(&pcm.source, pcm.format)
        .with_context(|| format!("Failed to analyze {}", args.input.display()))?;

    let label = args.input.display().to_string();
    println!("{}", render(&label, &result, args.format, verbose)?);
    Ok(())
}
