//! Cooperative cancellation for the async-style query paths.
//!
//! Cancellation is an out-of-band signal, not an error: cancellable
//! operations return `Result<_, Cancelled>` and telemetry counts cancelled
//! runs separately from failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sentinel carried by a cancelled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Shared flag polled at the pipeline checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone of the token observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Checkpoint: `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Checkpoint helper for paths that may run without a token.
pub(crate) fn check(token: Option<&CancelToken>) -> Result<(), Cancelled> {
    match token {
        Some(t) => t.check(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_observed_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(Cancelled));
    }

    #[test]
    fn test_absent_token_never_cancels() {
        assert!(check(None).is_ok());
    }
}
