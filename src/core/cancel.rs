// src/core/cancel.rs
//
// Cooperative cancellation. Analyzers poll the token at chunk boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{AnalysisError, Result};

/// Cancellation signal shared between a caller and a running analysis
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<(Instant, Duration)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some((Instant::now() + timeout, timeout)),
        }
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with `Cancelled` or `Timeout` if the analysis should stop
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(AnalysisError::Timeout(timeout));
            }
        }
        Ok(())
    }
}
