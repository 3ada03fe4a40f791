// Run-wide "did anything match" flag

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// First-true-wins flag shared by every node of one workflow run.
#[derive(Debug, Clone, Default)]
pub struct MatchAggregator {
    matched: Arc<AtomicBool>,
}

impl MatchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the flag to true if `matched` is true and nobody did yet.
    ///
    /// Returns whether this call flipped it.
    pub fn publish(&self, matched: bool) -> bool {
        matched
            && self
                .matched
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Read once the run's worker budget has drained.
    pub fn final_value(&self) -> bool {
        self.matched.load(Ordering::Acquire)
    }
}
