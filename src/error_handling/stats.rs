//! Failure statistics tracking.
//!
//! Thread-safe counters for classified failures, shared by every step the
//! engine runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::classifier::RetryDecision;
use super::types::ErrorKind;

/// Thread-safe failure statistics tracker.
///
/// Every [`ErrorKind`] is initialized to zero on creation, so lookups never
/// miss. Share across tasks with `Arc`.
pub struct FailureStats {
    by_kind: HashMap<ErrorKind, AtomicUsize>,
    fatal: AtomicUsize,
    retryable: AtomicUsize,
}

impl FailureStats {
    pub fn new() -> Self {
        let mut by_kind = HashMap::new();
        for kind in ErrorKind::iter() {
            by_kind.insert(kind, AtomicUsize::new(0));
        }
        FailureStats {
            by_kind,
            fatal: AtomicUsize::new(0),
            retryable: AtomicUsize::new(0),
        }
    }

    /// Records one classified failure.
    pub fn record(&self, kind: ErrorKind, decision: RetryDecision) {
        if let Some(counter) = self.by_kind.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("No failure counter for {:?}; FailureStats was built without it", kind);
        }
        match decision {
            RetryDecision::Fatal => self.fatal.fetch_add(1, Ordering::Relaxed),
            RetryDecision::Retryable { .. } => self.retryable.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.by_kind
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_kind
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }

    pub fn fatal(&self) -> usize {
        self.fatal.load(Ordering::SeqCst)
    }

    pub fn retryable(&self) -> usize {
        self.retryable.load(Ordering::SeqCst)
    }
}

impl Default for FailureStats {
    fn default() -> Self {
        Self::new()
    }
}
