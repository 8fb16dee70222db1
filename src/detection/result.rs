//! Issue and result types produced by scoring

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Check;
use crate::core::analysis::{
    BitDepthResult, ClippingResult, DcOffsetResult, DropoutResult, LoudnessResult, SilenceResult,
    SpectralResult, StereoResult, TruePeakResult, TruncationResult,
};

/// Severity of an issue, ordered from harmless to worst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    #[default]
    NoIssue,
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::NoIssue,
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Severity::NoIssue => "no-issue",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::NoIssue => "✓",
            Severity::Mild => "ℹ",
            Severity::Moderate => "⚠",
            Severity::Severe => "✗",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub check: Check,
    pub detected: bool,
    pub severity: Severity,
    pub summary: String,
    /// In [0, 1]
    pub confidence: f64,
}

impl Issue {
    /// A detected issue; `severity` must not be `NoIssue`
    pub fn detected(check: Check, severity: Severity, confidence: f64, summary: impl Into<String>) -> Self {
        Self {
            check,
            detected: true,
            severity,
            summary: summary.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn clean(check: Check, summary: impl Into<String>) -> Self {
        Self {
            check,
            detected: false,
            severity: Severity::NoIssue,
            summary: summary.into(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub issue_count: usize,
    pub worst_severity: Severity,
}

impl Summary {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let detected = issues.iter().filter(|i| i.detected);
        Self {
            issue_count: detected.clone().count(),
            worst_severity: detected.map(|i| i.severity).max().unwrap_or_default(),
        }
    }
}

/// Raw analyzer outputs; an entry is present when a selected check needed it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipping: Option<ClippingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<TruncationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<BitDepthResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral: Option<SpectralResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dc_offset: Option<DcOffsetResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo: Option<StereoResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence: Option<SilenceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_peak: Option<TruePeakResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loudness: Option<LoudnessResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropouts: Option<DropoutResult>,
}

/// Complete analysis of one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: Summary,
    pub issues: Vec<Issue>,
    #[serde(flatten)]
    pub raw: RawResults,
}

impl AnalysisResult {
    pub fn new(issues: Vec<Issue>, raw: RawResults) -> Self {
        Self {
            summary: Summary::from_issues(&issues),
            issues,
            raw,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.summary.issue_count
    }

    pub fn worst_severity(&self) -> Severity {
        self.summary.worst_severity
    }

    pub fn issue(&self, check: Check) -> Option<&Issue> {
        self.issues.iter().find(|i| i.check == check)
    }

    pub fn detected(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_and_names() {
        assert!(Severity::NoIssue < Severity::Mild);
        assert!(Severity::Moderate < Severity::Severe);
        assert_eq!(serde_json::to_string(&Severity::NoIssue).unwrap(), "\"no-issue\"");
        assert_eq!(Severity::Severe.to_string(), "severe");
    }

    #[test]
    fn test_summary_counts_detected_only() {
        let issues = vec![
            Issue::clean(Check::Clipping, "none"),
            Issue::detected(Check::Hum, Severity::Moderate, 0.5, "hum"),
            Issue::detected(Check::DcOffset, Severity::Mild, 2.0, "dc"),
        ];
        let result = AnalysisResult::new(issues, RawResults::default());
        assert_eq!(result.issue_count(), 2);
        assert_eq!(result.worst_severity(), Severity::Moderate);
        assert_eq!(result.issue(Check::DcOffset).unwrap().confidence, 1.0);
    }

    #[test]
    fn test_empty_result_is_clean() {
        let result = AnalysisResult::new(Vec::new(), RawResults::default());
        assert_eq!(result.worst_severity(), Severity::NoIssue);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("clipping").is_none());
        assert_eq!(json["summary"]["worst_severity"], "no-issue");
    }
}
