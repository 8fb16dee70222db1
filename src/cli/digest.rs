//! Digest of a JSONL report: tallies per check and severity

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use colorful::Colorful;

use super::args::DigestArgs;
use super::report::ReportLine;
use crate::config::Check;
use crate::detection::Severity;
use crate::error::AnalysisError;

/// A file where the selected check was detected
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub file: String,
    pub severity: Severity,
    pub confidence: f64,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Digest {
    pub analyzed: usize,
    pub failed: usize,
    /// Lines that were not valid report JSON
    pub invalid_lines: usize,
    /// Detected issues per check
    pub per_check: BTreeMap<Check, usize>,
    /// Detected issues per severity
    pub per_severity: BTreeMap<Severity, usize>,
    /// Failures per error kind (the text before the first colon)
    pub errors: BTreeMap<String, usize>,
    pub hits: Vec<Hit>,
}

impl Digest {
    /// Read every line of a report; `issue` selects which check's hits to collect
    pub fn from_reader<R: BufRead>(reader: R, issue: Option<Check>) -> Result<Self> {
        let mut digest = Digest::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ReportLine>(&line) {
                Ok(record) => digest.add(record, issue),
                Err(e) => {
                    let err = AnalysisError::InvalidJson {
                        line: idx + 1,
                        message: e.to_string(),
                    };
                    log::warn!("{}", err);
                    digest.invalid_lines += 1;
                }
            }
        }

        digest.hits.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.file.cmp(&b.file))
        });
        Ok(digest)
    }

    fn add(&mut self, record: ReportLine, issue: Option<Check>) {
        if let Some(error) = &record.error {
            self.failed += 1;
            let kind = error.split(':').next().unwrap_or(error).trim().to_string();
            *self.errors.entry(kind).or_default() += 1;
            return;
        }
        let Some(analysis) = record.analysis else {
            self.failed += 1;
            *self.errors.entry("no-analysis".to_string()).or_default() += 1;
            return;
        };

        self.analyzed += 1;
        for found in analysis.detected() {
            *self.per_check.entry(found.check).or_default() += 1;
            *self.per_severity.entry(found.severity).or_default() += 1;
            if issue == Some(found.check) {
                self.hits.push(Hit {
                    file: record.file.clone().unwrap_or_else(|| "<unnamed>".to_string()),
                    severity: found.severity,
                    confidence: found.confidence,
                    summary: found.summary.clone(),
                });
            }
        }
    }

    pub fn format_text(&self, issue: Option<Check>) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Files: {} analyzed, {} failed, {} unreadable line(s)\n",
            self.analyzed, self.failed, self.invalid_lines
        ));

        if !self.errors.is_empty() {
            out.push_str("\nFailures:\n");
            for (kind, count) in &self.errors {
                out.push_str(&format!("  {:<24} {}\n", kind, count));
            }
        }

        out.push_str("\nIssues by check:\n");
        if self.per_check.is_empty() {
            out.push_str(&format!("  {}\n", "none".green()));
        }
        for (check, count) in &self.per_check {
            out.push_str(&format!("  {:<24} {}\n", check.name(), count));
        }

        out.push_str("\nIssues by severity:\n");
        for severity in Severity::ALL.iter().skip(1).rev() {
            let count = self.per_severity.get(severity).copied().unwrap_or(0);
            out.push_str(&format!("  {} {:<22} {}\n", severity.symbol(), severity.name(), count));
        }

        if let Some(check) = issue {
            out.push_str(&format!("\nFiles with {}:\n", check.name().yellow()));
            for hit in &self.hits {
                out.push_str(&format!(
                    "  [{}] {} ({:.0}%) {}\n",
                    hit.severity, hit.file, hit.confidence * 100.0, hit.summary
                ));
            }
        }
        out
    }
}

pub fn run(args: &DigestArgs) -> Result<()> {
    let file = File::open(&args.report)
        .with_context(|| format!("Failed to open report: {}", args.report.display()))?;
    let digest = Digest::from_reader(BufReader::new(file), args.issue)?;
    print!("{}", digest.format_text(args.issue));
    Ok(())
}
