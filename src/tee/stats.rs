//! Counters of data mirrored to a tee process

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Counters {
    frames: AtomicU64,
    bytes: AtomicU64,
    failures: AtomicU64,
}

/// Shared view on a tee reader's progress
///
/// Cloning yields another handle on the same counters, so a monitor can keep
/// one while the reader is moved into a pipeline.
#[derive(Debug, Clone, Default)]
pub struct TeeStats {
    counters: Arc<Counters>,
}

impl TeeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame fully written to the process
    pub fn record_frame(&self, size: usize) {
        self.counters.frames.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes
            .fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a read that ended the stream with an error
    pub fn record_failure(&self) {
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames(&self) -> u64 {
        self.counters.frames.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.counters.bytes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let stats = TeeStats::new();
        let monitor = stats.clone();
        stats.record_frame(1024);
        stats.record_frame(512);
        stats.record_failure();
        assert_eq!(monitor.frames(), 2);
        assert_eq!(monitor.bytes(), 1536);
        assert_eq!(monitor.failures(), 1);
    }
}
