use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Running counters for one scan, shared between the worker and its caller.
///
/// Callers that want partial figures after a cancellation read them here;
/// the scan itself delivers no partial results.
pub struct ProgressTracker {
    pub completed: AtomicUsize,
    pub total: AtomicUsize,
    pub skipped: AtomicUsize,
    pub bytes_measured: AtomicU64,
    pub start_time: Instant,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            bytes_measured: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn record_sized(&self, bytes: u64) {
        self.bytes_measured.fetch_add(bytes, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < f64::EPSILON {
            return 0.0;
        }
        self.completed.load(Ordering::Relaxed) as f64 / elapsed
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            bytes_measured: self.bytes_measured.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
            items_per_second: self.items_per_second(),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub skipped: usize,
    pub bytes_measured: u64,
    pub elapsed: Duration,
    pub items_per_second: f64,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> usize {
        percent(self.completed, self.total)
    }
}

/// Whole-number completion percentage; 0 when nothing was enumerated.
pub fn percent(completed: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        completed.saturating_mul(100) / total
    }
}
