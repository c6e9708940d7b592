//! # Dispatcher Statistics
//!
//! Counters are atomics so producers and readers never touch the queue lock.
//! The rolling processing-time window has its own small mutex, only taken by
//! the processing thread; readers see the derived average through an atomic.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Number of processing passes averaged.
pub const PROCESSING_WINDOW: usize = 100;

/// Point-in-time copy of the dispatcher counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombatStats {
    /// Actions accepted into a tier.
    pub total_actions: u64,
    /// Actions forwarded (or no-op forwarded) by a processing pass.
    pub processed_actions: u64,
    /// Actions rejected at admission plus actions evicted as stale.
    pub dropped_actions: u64,
    /// Average pass duration over the last [`PROCESSING_WINDOW`] passes.
    pub average_processing_us: u64,
    /// Longest pass observed.
    pub peak_processing_us: u64,
    /// Processing passes completed.
    pub passes: u64,
}

impl fmt::Display for CombatStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted={} processed={} dropped={} passes={} avg={}us peak={}us",
            self.total_actions,
            self.processed_actions,
            self.dropped_actions,
            self.passes,
            self.average_processing_us,
            self.peak_processing_us,
        )
    }
}

/// Rolling window of pass durations.
#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<u64>,
    sum: u64,
}

/// Shared counters updated by producers and the processing pass.
#[derive(Debug)]
pub struct StatsRecorder {
    total: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
    passes: AtomicU64,
    average_us: AtomicU64,
    peak_us: AtomicU64,
    window: Mutex<Window>,
}

impl StatsRecorder {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            average_us: AtomicU64::new(0),
            peak_us: AtomicU64::new(0),
            window: Mutex::new(Window {
                samples: VecDeque::with_capacity(PROCESSING_WINDOW),
                sum: 0,
            }),
        }
    }

    /// Counts one accepted action.
    #[inline]
    pub fn record_accepted(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts forwarded actions.
    #[inline]
    pub fn record_processed(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts rejected or evicted actions.
    #[inline]
    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Records the duration of one processing pass.
    pub fn record_pass(&self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let average = {
            let mut window = self.window.lock();
            if window.samples.len() == PROCESSING_WINDOW {
                if let Some(oldest) = window.samples.pop_front() {
                    window.sum -= oldest;
                }
            }
            window.samples.push_back(us);
            window.sum = window.sum.saturating_add(us);
            window.sum / window.samples.len() as u64
        };
        self.average_us.store(average, Ordering::Relaxed);
        self.peak_us.fetch_max(us, Ordering::Relaxed);
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    /// Dropped count alone, for telemetry folding.
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Copies every counter.
    #[must_use]
    pub fn snapshot(&self) -> CombatStats {
        CombatStats {
            total_actions: self.total.load(Ordering::Relaxed),
            processed_actions: self.processed.load(Ordering::Relaxed),
            dropped_actions: self.dropped.load(Ordering::Relaxed),
            average_processing_us: self.average_us.load(Ordering::Relaxed),
            peak_processing_us: self.peak_us.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter and the window.
    pub fn reset(&self) {
        {
            let mut window = self.window.lock();
            window.samples.clear();
            window.sum = 0;
        }
        self.total.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.passes.store(0, Ordering::Relaxed);
        self.average_us.store(0, Ordering::Relaxed);
        self.peak_us.store(0, Ordering::Relaxed);
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
