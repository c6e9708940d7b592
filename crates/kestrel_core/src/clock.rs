//! # Time Source
//!
//! Every timestamp in KESTREL is a monotonic [`Instant`] obtained from a
//! [`Clock`]. Components take a `SharedClock` at construction instead of
//! calling `Instant::now()` directly, so tests can move time by hand:
//!
//! ```text
//! SystemClock  ──► Instant::now()            (servers, benches)
//! ManualClock  ──► base + advanced offset    (tests, replays)
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock shared between the components of one server.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Returns the system clock as a [`SharedClock`].
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock. Clones share the same timeline.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Creates a clock frozen at the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// The instant this clock started at.
    #[must_use]
    pub const fn start(&self) -> Instant {
        self.base
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Moves time forward by fractional seconds. Negative values are ignored.
    pub fn advance_secs(&self, secs: f32) {
        if let Ok(by) = Duration::try_from_secs_f32(secs) {
            self.advance(by);
        }
    }

    /// Time elapsed since [`ManualClock::start`].
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Instant `secs` seconds after the start of this clock.
    #[must_use]
    pub fn at_secs(&self, secs: f32) -> Instant {
        offset_instant(self.base, -secs)
    }

    /// Returns a [`SharedClock`] handle onto this timeline.
    #[must_use]
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.elapsed.lock()
    }
}

/// Returns `now - offset_secs`; negative offsets look into the future.
///
/// Non-finite offsets and instants outside the platform's range collapse to
/// `now`.
#[must_use]
pub fn offset_instant(now: Instant, offset_secs: f32) -> Instant {
    let Ok(magnitude) = Duration::try_from_secs_f32(offset_secs.abs()) else {
        return now;
    };
    let shifted = if offset_secs >= 0.0 {
        now.checked_sub(magnitude)
    } else {
        now.checked_add(magnitude)
    };
    shifted.unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_shared_timeline() {
        let clock = ManualClock::new();
        let handle = clock.shared();
        let t0 = handle.now();

        clock.advance(Duration::from_millis(250));
        assert_eq!(handle.now() - t0, Duration::from_millis(250));

        clock.advance_secs(0.75);
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_advance_secs_ignores_negative() {
        let clock = ManualClock::new();
        clock.advance_secs(-1.0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_offset_instant_both_directions() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(10));
        let now = clock.now();

        assert_eq!(now - offset_instant(now, 2.0), Duration::from_secs(2));
        assert_eq!(offset_instant(now, -2.0) - now, Duration::from_secs(2));
        assert_eq!(offset_instant(now, f32::NAN), now);
    }

    #[test]
    fn test_at_secs_is_relative_to_start() {
        let clock = ManualClock::new();
        assert_eq!(clock.at_secs(1.5) - clock.start(), Duration::from_millis(1500));
    }
}
