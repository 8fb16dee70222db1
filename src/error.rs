//! Error types for pcmaudit

use std::time::Duration;
use thiserror::Error;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while analyzing a PCM stream
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The underlying byte source failed
    #[error("read failure: {0}")]
    Read(#[from] std::io::Error),

    /// Format or option contract violation (bit depth, sample rate, channels)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cancellation token fired before the analysis completed
    #[error("analysis cancelled")]
    Cancelled,

    /// The wall-clock deadline attached to the cancellation token expired
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Container probing or decoding failed
    #[error("command failed: {0}")]
    Command(String),

    /// The input lacks something the analysis needs (audio track, sample rate)
    #[error("missing requirement: {0}")]
    MissingRequirement(String),

    /// A report line could not be parsed
    #[error("invalid JSON on line {line}: {message}")]
    InvalidJson { line: usize, message: String },
}

impl AnalysisError {
    /// Short kebab-case name of the error kind, used in report lines
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Read(_) => "read-failure",
            AnalysisError::InvalidConfig(_) => "invalid-config",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::Command(_) => "command-failure",
            AnalysisError::MissingRequirement(_) => "missing-requirement",
            AnalysisError::InvalidJson { .. } => "invalid-json",
        }
    }
}

impl From<symphonia::core::errors::Error> for AnalysisError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        match err {
            symphonia::core::errors::Error::IoError(e) => Self::Read(e),
            other => Self::Command(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(AnalysisError::from(io).kind(), "read-failure");
        assert_eq!(AnalysisError::Timeout(Duration::from_secs(60)).kind(), "timeout");
        assert_eq!(
            AnalysisError::InvalidJson { line: 3, message: "eof".into() }.to_string(),
            "invalid JSON on line 3: eof"
        );
    }
}
