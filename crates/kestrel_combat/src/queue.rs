//! # Bounded Priority Tiers
//!
//! Four FIFO buffers carved out of one `max_queue_size`:
//!
//! ```text
//! max_queue_size = 1000
//! ┌──────────┬──────────┬─────────────────────┬──────────┐
//! │ Critical │   High   │       Medium        │   Low    │
//! │   250    │   250    │        500          │   250    │
//! └──────────┴──────────┴─────────────────────┴──────────┘
//! ```
//!
//! Admission, in order:
//! 1. Low is shed once total occupancy exceeds 80% of `max_queue_size`,
//!    Medium once it exceeds 90%. Critical and High are never shed.
//! 2. Any tier refuses when its own buffer is full.
//!
//! Not synchronized: the dispatcher owns one of these behind its queue mutex.

use crate::action::CombatAction;
use crate::error::Rejected;
use crate::priority::Priority;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Occupancy, in tenths of `max_queue_size`, above which Low is shed.
const LOW_SHED_TENTHS: usize = 8;

/// Occupancy, in tenths of `max_queue_size`, above which Medium is shed.
const MEDIUM_SHED_TENTHS: usize = 9;

/// Upper bound on the slots reserved up front per tier.
const PREALLOCATED_SLOTS: usize = 4096;

/// True if `occupancy` exceeds `tenths / 10` of `max_queue_size`.
const fn above_tenths(occupancy: usize, max_queue_size: usize, tenths: usize) -> bool {
    occupancy.saturating_mul(10) > max_queue_size.saturating_mul(tenths)
}

/// Four bounded FIFO tiers.
#[derive(Debug)]
pub struct PriorityQueues {
    tiers: [VecDeque<CombatAction>; 4],
    capacities: [usize; 4],
    max_queue_size: usize,
}

impl PriorityQueues {
    /// Creates empty tiers partitioned from `max_queue_size`.
    #[must_use]
    pub fn new(max_queue_size: usize) -> Self {
        let capacities = Self::partition(max_queue_size);
        Self {
            tiers: capacities
                .map(|capacity| VecDeque::with_capacity(capacity.min(PREALLOCATED_SLOTS))),
            capacities,
            max_queue_size,
        }
    }

    /// Per-tier capacities for a total of `max_queue_size`.
    #[must_use]
    pub const fn partition(max_queue_size: usize) -> [usize; 4] {
        [
            max_queue_size / 4,
            max_queue_size / 4,
            max_queue_size / 2,
            max_queue_size / 4,
        ]
    }

    /// Configured total size.
    #[inline]
    #[must_use]
    pub const fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Capacity of one tier.
    #[inline]
    #[must_use]
    pub const fn capacity(&self, tier: Priority) -> usize {
        self.capacities[tier.index()]
    }

    /// Entries queued in one tier.
    #[inline]
    #[must_use]
    pub fn len(&self, tier: Priority) -> usize {
        self.tiers[tier.index()].len()
    }

    /// Entries queued across all tiers.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }

    /// True if every tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(VecDeque::is_empty)
    }

    /// Occupancy as a fraction of `max_queue_size`, clamped to `[0, 1]`.
    #[must_use]
    pub fn load(&self) -> f32 {
        if self.max_queue_size == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let load = self.total_len() as f32 / self.max_queue_size as f32;
        load.min(1.0)
    }

    /// True once total occupancy exceeds 80% of `max_queue_size`.
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        above_tenths(self.total_len(), self.max_queue_size, LOW_SHED_TENTHS)
    }

    /// Checks the admission policy for `tier` without inserting anything.
    pub fn check_admission(&self, tier: Priority) -> Result<(), Rejected> {
        let occupancy = self.total_len();
        let shed_tenths = match tier {
            Priority::Low => Some(LOW_SHED_TENTHS),
            Priority::Medium => Some(MEDIUM_SHED_TENTHS),
            Priority::Critical | Priority::High => None,
        };
        if let Some(tenths) = shed_tenths {
            if above_tenths(occupancy, self.max_queue_size, tenths) {
                return Err(Rejected::LoadShed {
                    tier,
                    occupancy,
                    capacity: self.max_queue_size,
                });
            }
        }

        let capacity = self.capacity(tier);
        if self.len(tier) >= capacity {
            return Err(Rejected::TierFull { tier, capacity });
        }
        Ok(())
    }

    /// Appends `action` to the tail of its tier if the admission policy allows.
    pub fn admit(&mut self, action: CombatAction) -> Result<(), Rejected> {
        let tier = action.priority;
        self.check_admission(tier)?;
        self.tiers[tier.index()].push_back(action);
        Ok(())
    }

    /// Removes up to `max` entries from the head of `tier`.
    pub fn pop_batch(&mut self, tier: Priority, max: usize) -> Vec<CombatAction> {
        let queue = &mut self.tiers[tier.index()];
        let count = max.min(queue.len());
        queue.drain(..count).collect()
    }

    /// Removes every entry older than `max_age` at `now`, returns how many.
    pub fn evict_older_than(&mut self, now: Instant, max_age: Duration) -> usize {
        let mut evicted = 0;
        for queue in &mut self.tiers {
            let before = queue.len();
            queue.retain(|action| now.saturating_duration_since(action.created_at) <= max_age);
            evicted += before - queue.len();
        }
        evicted
    }

    /// Empties one tier, returns how many entries were discarded.
    pub fn clear(&mut self, tier: Priority) -> usize {
        let queue = &mut self.tiers[tier.index()];
        let count = queue.len();
        queue.clear();
        count
    }

    /// Empties every tier, returns how many entries were discarded.
    pub fn clear_all(&mut self) -> usize {
        Priority::ALL.iter().map(|&tier| self.clear(tier)).sum()
    }

    /// Re-partitions capacities. Entries already queued are kept even if a
    /// tier ends up over its new capacity; it simply refuses admissions until
    /// it drains.
    pub fn resize(&mut self, max_queue_size: usize) {
        self.max_queue_size = max_queue_size;
        self.capacities = Self::partition(max_queue_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionId, ActionPayload};
    use kestrel_core::Vec4;

    fn action(id: u64, priority: Priority, created_at: Instant) -> CombatAction {
        CombatAction::new(
            ActionId(id),
            1,
            priority,
            ActionPayload::Movement {
                position: Vec4::ORIGIN,
                velocity: Vec4::ZERO,
            },
            created_at,
        )
    }

    #[test]
    fn test_partition() {
        assert_eq!(PriorityQueues::partition(1000), [250, 250, 500, 250]);
        assert_eq!(PriorityQueues::partition(10), [2, 2, 5, 2]);
    }

    #[test]
    fn test_tier_full() {
        let now = Instant::now();
        let mut queues = PriorityQueues::new(8);
        assert!(queues.admit(action(1, Priority::Critical, now)).is_ok());
        assert!(queues.admit(action(2, Priority::Critical, now)).is_ok());
        assert_eq!(
            queues.admit(action(3, Priority::Critical, now)),
            Err(Rejected::TierFull {
                tier: Priority::Critical,
                capacity: 2
            })
        );
        assert_eq!(queues.total_len(), 2);
    }

    #[test]
    fn test_low_shed_before_medium() {
        let now = Instant::now();
        // Capacities 25/25/50/25; fill to 85 entries.
        let mut queues = PriorityQueues::new(100);
        let mut id = 0;
        for tier in [Priority::Critical, Priority::High] {
            for _ in 0..25 {
                id += 1;
                queues.admit(action(id, tier, now)).unwrap();
            }
        }
        for _ in 0..35 {
            id += 1;
            queues.admit(action(id, Priority::Medium, now)).unwrap();
        }
        assert_eq!(queues.total_len(), 85);

        assert!(matches!(
            queues.admit(action(100, Priority::Low, now)),
            Err(Rejected::LoadShed { tier: Priority::Low, occupancy: 85, .. })
        ));
        assert!(queues.admit(action(101, Priority::Medium, now)).is_ok());
    }

    #[test]
    fn test_shedding_is_strictly_above_threshold() {
        let now = Instant::now();
        let mut queues = PriorityQueues::new(40);
        // Capacities 10/10/20/10; reach exactly 80% = 32.
        for i in 0..10 {
            queues.admit(action(i, Priority::Critical, now)).unwrap();
            queues.admit(action(100 + i, Priority::High, now)).unwrap();
        }
        for i in 0..12 {
            queues.admit(action(200 + i, Priority::Medium, now)).unwrap();
        }
        assert_eq!(queues.total_len(), 32);
        assert!(!queues.is_overloaded());
        assert!(queues.admit(action(300, Priority::Low, now)).is_ok());
        assert!(queues.is_overloaded());
    }

    #[test]
    fn test_pop_batch_is_fifo() {
        let now = Instant::now();
        let mut queues = PriorityQueues::new(100);
        for i in 0..5 {
            queues.admit(action(i, Priority::High, now)).unwrap();
        }
        let batch = queues.pop_batch(Priority::High, 3);
        let ids: Vec<_> = batch.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(queues.len(Priority::High), 2);
    }

    #[test]
    fn test_evict_by_age() {
        let base = Instant::now();
        let mut queues = PriorityQueues::new(100);
        queues.admit(action(1, Priority::Low, base)).unwrap();
        queues
            .admit(action(2, Priority::Critical, base + Duration::from_secs(4)))
            .unwrap();

        let now = base + Duration::from_secs(6);
        assert_eq!(queues.evict_older_than(now, Duration::from_secs(5)), 1);
        assert_eq!(queues.len(Priority::Low), 0);
        assert_eq!(queues.len(Priority::Critical), 1);
    }

    #[test]
    fn test_huge_capacity_does_not_overflow() {
        let now = Instant::now();
        let mut queues = PriorityQueues::new(usize::MAX);
        assert!(!queues.is_overloaded());
        assert!(queues.check_admission(Priority::Low).is_ok());
        assert!(queues.admit(action(1, Priority::Medium, now)).is_ok());
        assert!(queues.admit(action(2, Priority::Low, now)).is_ok());
        assert_eq!(queues.total_len(), 2);

        queues.resize(usize::MAX - 1);
        assert!(queues.check_admission(Priority::Medium).is_ok());
    }

    #[test]
    fn test_resize_keeps_entries() {
        let now = Instant::now();
        let mut queues = PriorityQueues::new(100);
        for i in 0..10 {
            queues.admit(action(i, Priority::High, now)).unwrap();
        }
        queues.resize(20);
        assert_eq!(queues.capacity(Priority::High), 5);
        assert_eq!(queues.len(Priority::High), 10);
        assert!(queues.admit(action(99, Priority::High, now)).is_err());
        assert_eq!(queues.clear_all(), 10);
        assert!(queues.is_empty());
    }
}
