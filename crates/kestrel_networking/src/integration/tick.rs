//! # Processing Tick Pacer
//!
//! Fixed-rate pacing for the combat processing thread.
//!
//! Each tick is scheduled one interval after the previous tick *started*, so
//! pass time is absorbed into the interval instead of stretching it. The
//! pacer never sleeps itself: the caller waits [`TickPacer::time_until_next_tick`]
//! on whatever it uses as an interruptible sleep.

use std::time::{Duration, Instant};

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Shortest tick observed (`u64::MAX` before the first tick).
    pub min_tick_us: u64,
    /// Longest tick observed.
    pub max_tick_us: u64,
    /// Rolling average tick duration.
    pub avg_tick_us: u64,
    /// Ticks that exceeded the processing budget.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    /// Stats before any tick.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: 0,
            late_ticks: 0,
            total_ticks: 0,
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-interval tick controller.
#[derive(Debug)]
pub struct TickPacer {
    interval: Duration,
    next_tick: Instant,
    tick_count: u64,
    stats: TickStats,
}

impl TickPacer {
    /// Creates a pacer whose first tick is due immediately.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: Instant::now(),
            tick_count: 0,
            stats: TickStats::new(),
        }
    }

    /// Changes the interval from the next tick on.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Target tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Marks the start of a tick and schedules the next one.
    ///
    /// Returns the tick start time for duration measurement.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        let now = Instant::now();
        self.tick_count += 1;
        self.next_tick = now + self.interval;
        now
    }

    /// Marks the end of a tick; durations above `budget` count as late.
    pub fn end_tick(&mut self, start: Instant, budget: Duration) {
        let duration = start.elapsed();
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        let stats = &mut self.stats;
        stats.min_tick_us = stats.min_tick_us.min(duration_us);
        stats.max_tick_us = stats.max_tick_us.max(duration_us);
        stats.avg_tick_us = if stats.total_ticks == 0 {
            duration_us
        } else {
            (stats.avg_tick_us.saturating_mul(15).saturating_add(duration_us)) / 16
        };
        stats.total_ticks += 1;

        if duration > budget {
            stats.late_ticks += 1;
        }
    }

    /// Time left before the next tick is due; zero when overdue.
    #[must_use]
    pub fn time_until_next_tick(&self) -> Duration {
        self.next_tick.saturating_duration_since(Instant::now())
    }

    /// Ticks begun.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::new();
    }
}
