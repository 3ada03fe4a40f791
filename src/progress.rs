// Progress accounting sink

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives request totals as checks are scheduled.
pub trait Progress: Send + Sync + std::fmt::Debug {
    fn add_to_total(&self, requests: u64);
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn add_to_total(&self, _requests: u64) {}
}

/// Keeps a running total of announced requests.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: AtomicU64,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Progress for ProgressCounter {
    fn add_to_total(&self, requests: u64) {
        self.total.fetch_add(requests, Ordering::Relaxed);
    }
}
