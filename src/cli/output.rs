//! Output formatting for CLI results

use colorful::{Color, Colorful};

use super::args::OutputFormat;
use crate::detection::{AnalysisResult, Issue, RawResults, Severity};

/// Render one analysis in the requested format
pub fn render(label: &str, result: &AnalysisResult, format: OutputFormat, verbose: bool) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(format_text(label, result, verbose)),
        OutputFormat::Json => serde_json::to_string_pretty(result),
        OutputFormat::Markdown => Ok(format_markdown(label, result)),
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::NoIssue => Color::Green,
        Severity::Mild => Color::Cyan,
        Severity::Moderate => Color::Yellow,
        Severity::Severe => Color::Red,
    }
}

/// Format analysis result for terminal output
pub fn format_text(label: &str, result: &AnalysisResult, verbose: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("Analyzing: {}\n", label.cyan()));

    if result.issue_count() == 0 {
        out.push_str(&format!("  Status: {}\n", "✓ CLEAN".green()));
    } else {
        let status = format!(
            "✗ {} ISSUE{} (worst: {})",
            result.issue_count(),
            if result.issue_count() == 1 { "" } else { "S" },
            result.worst_severity()
        );
        out.push_str(&format!("  Status: {}\n", status.color(severity_color(result.worst_severity()))));
    }

    for issue in &result.issues {
        if issue.detected || verbose {
            out.push_str(&format_issue(issue));
        }
    }

    if verbose {
        let details = details(&result.raw);
        if !details.is_empty() {
            out.push_str("\n  Technical Details:\n");
            for line in details {
                out.push_str(&format!("    {}\n", line));
            }
        }
    }
    out
}

fn format_issue(issue: &Issue) -> String {
    let head = format!("{} {}", issue.severity.symbol(), issue.check);
    format!(
        "    {} {} ({:.0}%)\n",
        head.color(severity_color(issue.severity)),
        issue.summary,
        issue.confidence * 100.0
    )
}

/// Format analysis result as a markdown table
pub fn format_markdown(label: &str, result: &AnalysisResult) -> String {
    let mut out = format!("## {}\n\n", label);
    out.push_str(&format!(
        "**Issues:** {} | **Worst severity:** {}\n\n",
        result.issue_count(),
        result.worst_severity()
    ));
    out.push_str("| Check | Severity | Confidence | Summary |\n");
    out.push_str("|---|---|---|---|\n");
    for issue in &result.issues {
        out.push_str(&format!(
            "| {} | {} | {:.0}% | {} |\n",
            issue.check,
            issue.severity,
            issue.confidence * 100.0,
            issue.summary.replace('|', "\\|")
        ));
    }
    out
}

/// Headline numbers from whichever analyzers ran
fn details(raw: &RawResults) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(b) = &raw.bit_depth {
        lines.push(format!("Bit depth: {} bit (claimed: {})", b.effective, b.claimed));
    }
    if let Some(c) = &raw.clipping {
        lines.push(format!(
            "Clipping: {} samples in {} runs (longest {})",
            c.clipped_samples, c.events, c.longest_run
        ));
    }
    if let Some(d) = &raw.dc_offset {
        lines.push(format!("DC offset: {:+.5} ({:.1} dB)", d.offset, d.offset_db));
    }
    if let Some(t) = &raw.truncation {
        lines.push(format!(
            "Final {:.0} ms: {:.1} dB RMS, {:.1} dB peak",
            t.window_ms, t.final_rms_db, t.final_peak_db
        ));
    }
    if let Some(s) = raw.stereo.as_ref().filter(|s| s.valid) {
        lines.push(format!(
            "Stereo: correlation {:.3}, side {:.1} dB, balance {:+.2} dB",
            s.correlation, s.difference_db, s.imbalance_db
        ));
    }
    if let Some(s) = &raw.silence {
        lines.push(format!(
            "Silence: {:.2}s leading, {:.2}s trailing, {:.2}s total",
            s.leading_sec, s.trailing_sec, s.total_silence_sec
        ));
    }
    if let Some(p) = &raw.true_peak {
        lines.push(format!(
            "Peak: {:.2} dBFS sample, {:.2} dBTP true ({} ISPs)",
            p.sample_peak_db, p.true_peak_db, p.isp_count
        ));
    }
    if let Some(l) = &raw.loudness {
        lines.push(format!(
            "Loudness: {:.1} LUFS, LRA {:.1} LU, DR{}",
            l.integrated_lufs, l.loudness_range_lu, l.dr_score
        ));
    }
    if let Some(s) = &raw.spectral {
        lines.push(format!(
            "Spectrum: centroid {:.0} Hz, noise floor {:.1} dB, {} windows",
            s.spectral_centroid_hz, s.noise_floor_db, s.windows_analyzed
        ));
        if s.transcode_cutoff > 0.0 {
            lines.push(format!("Frequency cutoff: {:.0} Hz", s.transcode_cutoff));
        }
    }
    if let Some(d) = &raw.dropouts {
        lines.push(format!(
            "Dropouts: {} events (worst {:.1} dB)",
            d.total_events, d.worst_db
        ));
    }
    lines
}
