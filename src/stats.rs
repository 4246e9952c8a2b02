// ============================================================================
// stats.rs - Pipeline Outcome Counters
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Thread-safe outcome counters, updated by workers and read by the
/// progress reporter and the final summary.
pub struct Statistics {
    checked: AtomicU64,
    matched: AtomicU64,
    derive_failures: AtomicU64,
    oracle_misses: AtomicU64,
    start_time: AtomicU64, // Unix timestamp in seconds (thread-safe)
}

impl Statistics {
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        Self {
            checked: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            derive_failures: AtomicU64::new(0),
            oracle_misses: AtomicU64::new(0),
            start_time: AtomicU64::new(now),
        }
    }

    pub fn increment_checked(&self) {
        self.checked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_derive_failed(&self) {
        self.derive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_oracle_miss(&self) {
        self.oracle_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checked(&self) -> u64 {
        self.checked.load(Ordering::Relaxed)
    }

    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Relaxed)
    }

    pub fn derive_failures(&self) -> u64 {
        self.derive_failures.load(Ordering::Relaxed)
    }

    pub fn oracle_misses(&self) -> u64 {
        self.oracle_misses.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> f64 {
        let start = self.start_time.load(Ordering::Relaxed);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        now.saturating_sub(start) as f64
    }

    /// Phrases checked per second since startup
    pub fn rate(&self) -> f64 {
        let checked = self.checked() as f64;
        let elapsed = self.elapsed();
        if elapsed > 0.0 {
            checked / elapsed
        } else {
            0.0
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
