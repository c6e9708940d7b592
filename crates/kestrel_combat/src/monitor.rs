//! # Performance Monitor
//!
//! Bounded history of per-pass samples (pass time, actions forwarded, queue
//! depth). The integration layer records one sample per tick while
//! monitoring is enabled; oldest samples fall off once the window is full.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default number of samples kept.
pub const DEFAULT_MONITOR_CAPACITY: usize = 1000;

/// One recorded pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerformanceSample {
    /// Pass duration.
    pub frame_time: Duration,
    /// Actions forwarded in the pass.
    pub actions: usize,
    /// Total queue depth after the pass.
    pub queue_size: usize,
}

/// Averages over the recorded window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceSummary {
    /// Samples in the window.
    pub samples: usize,
    /// Mean pass duration.
    pub average_frame_time: Duration,
    /// Longest pass in the window.
    pub max_frame_time: Duration,
    /// Mean actions forwarded per pass.
    pub average_actions: f32,
    /// Mean queue depth.
    pub average_queue_size: f32,
}

/// Rolling performance history.
#[derive(Debug)]
pub struct PerformanceMonitor {
    capacity: usize,
    enabled: AtomicBool,
    samples: Mutex<VecDeque<PerformanceSample>>,
}

impl PerformanceMonitor {
    /// Creates a stopped monitor keeping at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            enabled: AtomicBool::new(false),
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Starts accepting samples.
    pub fn start(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Stops accepting samples; history is kept.
    pub fn stop(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// True while samples are accepted.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Maximum samples kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records a sample if monitoring.
    pub fn record(&self, sample: PerformanceSample) {
        if !self.is_monitoring() {
            return;
        }
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Samples in the window, oldest first.
    #[must_use]
    pub fn samples(&self) -> Vec<PerformanceSample> {
        self.samples.lock().iter().copied().collect()
    }

    /// Averages over the window.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn summary(&self) -> PerformanceSummary {
        let samples = self.samples.lock();
        let count = samples.len();
        if count == 0 {
            return PerformanceSummary::default();
        }
        let total_time: Duration = samples.iter().map(|s| s.frame_time).sum();
        let max_frame_time = samples.iter().map(|s| s.frame_time).max().unwrap_or_default();
        let actions: usize = samples.iter().map(|s| s.actions).sum();
        let queued: usize = samples.iter().map(|s| s.queue_size).sum();
        PerformanceSummary {
            samples: count,
            average_frame_time: total_time / count as u32,
            max_frame_time,
            average_actions: actions as f32 / count as f32,
            average_queue_size: queued as f32 / count as f32,
        }
    }

    /// Forgets every sample.
    pub fn reset(&self) {
        self.samples.lock().clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MONITOR_CAPACITY)
    }
}
