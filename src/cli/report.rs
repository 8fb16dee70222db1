//! Batch report: one JSONL line per audio file below a folder

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::args::ReportArgs;
use crate::config::{Checks, Source};
use crate::core::{AudioAnalyzer, CancelToken, ContainerDecoder, DEFAULT_EXTRACT_TIMEOUT};
use crate::detection::AnalysisResult;
use crate::error::AnalysisError;

/// Extensions picked up by the folder walk
pub const AUDIO_EXTENSIONS: [&str; 10] = [
    "flac", "wav", "aiff", "aif", "mp3", "ogg", "m4a", "aac", "opus", "wv",
];

/// Wall-clock milliseconds spent per stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub probe_ms: f64,
    pub decode_ms: f64,
    pub analyze_ms: f64,
    pub total_ms: f64,
}

/// One line of a JSONL report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

fn describe(err: &AnalysisError) -> String {
    format!("{}: {}", err.kind(), err)
}

fn ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

/// Probe, extract and analyze one container. Failures are recorded in the line.
pub fn analyze_file(path: &Path, name: String, checks: Checks, source: Source) -> ReportLine {
    let started = Instant::now();
    let mut line = ReportLine {
        file: Some(name),
        ..Default::default()
    };

    let decoder = match ContainerDecoder::open(path) {
        Ok(decoder) => decoder,
        Err(e) => {
            log::warn!("{}: probe failed: {}", path.display(), e);
            line.probe_error = Some(describe(&e));
            line.error = Some(describe(&e));
            return line;
        }
    };
    let probe_ms = ms(started);
    match serde_json::to_value(decoder.probe()) {
        Ok(probe) => line.probe = Some(probe),
        Err(e) => line.probe_error = Some(e.to_string()),
    }

    let decode_start = Instant::now();
    let pcm = match decoder.decode(&CancelToken::with_timeout(DEFAULT_EXTRACT_TIMEOUT)) {
        Ok(pcm) => pcm,
        Err(e) => {
            log::warn!("{}: extraction failed: {}", path.display(), e);
            line.error = Some(describe(&e));
            return line;
        }
    };
    let decode_ms = ms(decode_start);

    let analyze_start = Instant::now();
    let analyzer = AudioAnalyzer::builder().checks(checks).source(source).build();
    match analyzer.analyze(&pcm.source, pcm.format) {
        Ok(result) => line.analysis = Some(result),
        Err(e) => {
            log::warn!("{}: analysis failed: {}", path.display(), e);
            line.error = Some(describe(&e));
            return line;
        }
    }

    line.timing = Some(Timing {
        probe_ms,
        decode_ms,
        analyze_ms: ms(analyze_start),
        total_ms: ms(started),
    });
    line
}

/// Audio files below `folder`, sorted by path
pub fn collect_audio_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_audio_file(p))
        .collect();
    files.sort();
    files
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Name recorded for a file: its path, or `md5:<hex>.<ext>` of the folder-relative path
pub fn display_name(path: &Path, folder: &Path, redact: bool) -> String {
    if !redact {
        return path.display().to_string();
    }
    let relative = path.strip_prefix(folder).unwrap_or(path);
    let digest = md5::compute(relative.to_string_lossy().as_bytes());
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("md5:{:x}.{}", digest, ext),
        None => format!("md5:{:x}", digest),
    }
}

/// Run the batch and write the JSONL lines in path order
pub fn run(args: &ReportArgs) -> Result<()> {
    if !args.folder.is_dir() {
        anyhow::bail!("not a folder: {}", args.folder.display());
    }
    let files = collect_audio_files(&args.folder);
    let workers = args
        .workers
        .filter(|&n| n > 0)
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    log::info!("{} audio file(s), {} worker(s)", files.len(), workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|idx| format!("report-{}", idx))
        .build()
        .context("Failed to create worker pool")?;

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let checks = args.checks.checks;
    let source = args.checks.source;
    let lines: Vec<ReportLine> = pool.install(|| {
        files
            .par_iter()
            .progress_with(progress.clone())
            .map(|path| {
                let name = display_name(path, &args.folder, args.redact_path);
                analyze_file(path, name, checks, source)
            })
            .collect()
    });
    progress.finish_and_clear();

    let failed = lines.iter().filter(|l| l.error.is_some()).count();
    log::info!("{} analyzed, {} failed", lines.len() - failed, failed);

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    write_lines(&mut out, &lines)?;
    out.flush()?;
    Ok(())
}

pub fn write_lines<W: Write>(out: &mut W, lines: &[ReportLine]) -> Result<()> {
    for line in lines {
        serde_json::to_writer(&mut *out, line)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(is_audio_file(Path::new("a/b/Track.FLAC")));
        assert!(is_audio_file(Path::new("x.opus")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("README")));
    }

    #[test]
    fn test_redacted_name() {
        let folder = Path::new("/music");
        let path = Path::new("/music/artist/song.flac");
        let name = display_name(path, folder, true);
        let expected = format!("md5:{:x}.flac", md5::compute(b"artist/song.flac"));
        assert_eq!(name, expected);
        assert_eq!(display_name(path, folder, false), "/music/artist/song.flac");
    }

    #[test]
    fn test_missing_file_becomes_error_line() {
        let line = analyze_file(
            Path::new("/nonexistent/missing.flac"),
            "missing.flac".to_string(),
            Checks::all(),
            Source::Digital,
        );
        assert!(line.analysis.is_none());
        assert!(line.error.as_deref().unwrap().starts_with("read-failure"));
        assert!(line.timing.is_none());
    }

    #[test]
    fn test_error_line_json_omits_empty_fields() {
        let line = ReportLine {
            file: Some("x.wav".to_string()),
            error: Some("timeout: timed out after 60s".to_string()),
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_lines(&mut buf, &[line]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"file\":\"x.wav\",\"error\":\"timeout: timed out after 60s\"}\n"
        );
    }
}
