//! Issue scoring and result types

mod result;
mod scoring;

pub use result::{AnalysisResult, Issue, RawResults, Severity, Summary};
pub use scoring::{build_result, score};
