// src/health/cache.rs
use arc_swap::ArcSwap;
use std::sync::Arc;

use super::outcome::{AggregateResult, StatusPolicy};

/// Single-slot holder of the latest aggregate result.
///
/// Writers swap in a whole new result; readers get an `Arc` to whichever
/// result was current at the time, never a partially written one.
pub struct ResultCache {
    current: ArcSwap<AggregateResult>,
}

impl ResultCache {
    /// A cache holding the pending sentinel.
    pub fn new(policy: &StatusPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(AggregateResult::pending(policy)),
        }
    }

    pub fn load(&self) -> Arc<AggregateResult> {
        self.current.load_full()
    }

    pub fn store(&self, result: AggregateResult) {
        self.current.store(Arc::new(result));
    }

    pub fn is_pending(&self) -> bool {
        self.current.load().is_pending()
    }
}
