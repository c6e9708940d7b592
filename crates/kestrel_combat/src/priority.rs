//! # Priority Classification
//!
//! Maps an action kind to one of four tiers. The mapping is a table value
//! ([`PriorityPolicy`]) so a server can retune it without touching call sites.
//!
//! ```text
//! Defense    ──► Critical   (reactions preempt everything)
//! Attack     ──► High
//! Sign       ──► High
//! Animation  ──► Medium
//! Movement   ──► Low        (most frequent, most latency tolerant)
//! ```

use crate::action::{ActionKind, PlayerId};
use std::fmt;

/// Processing tier. Lower discriminant drains first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Drained first every tick.
    Critical = 0,
    /// Drained after Critical.
    High = 1,
    /// Drained after High.
    Medium = 2,
    /// Drained last; first to be shed under load.
    Low = 3,
}

impl Priority {
    /// All tiers in drain order.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Index of this tier in per-tier arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-to-tier lookup table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityPolicy {
    table: [Priority; ActionKind::COUNT],
}

impl PriorityPolicy {
    /// The default relay policy.
    #[must_use]
    pub const fn new() -> Self {
        let mut table = [Priority::Low; ActionKind::COUNT];
        table[ActionKind::Attack.index()] = Priority::High;
        table[ActionKind::Defense.index()] = Priority::Critical;
        table[ActionKind::Sign.index()] = Priority::High;
        table[ActionKind::Animation.index()] = Priority::Medium;
        table[ActionKind::Movement.index()] = Priority::Low;
        Self { table }
    }

    /// Returns a copy of this policy with `kind` remapped.
    #[must_use]
    pub const fn with_priority(mut self, kind: ActionKind, priority: Priority) -> Self {
        self.table[kind.index()] = priority;
        self
    }

    /// Tier for an action of `kind` submitted by `_owner`.
    ///
    /// The owner is part of the contract for per-actor policies; the table
    /// policy ignores it.
    #[inline]
    #[must_use]
    pub const fn classify(&self, kind: ActionKind, _owner: PlayerId) -> Priority {
        self.table[kind.index()]
    }
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let policy = PriorityPolicy::default();
        assert_eq!(policy.classify(ActionKind::Defense, 1), Priority::Critical);
        assert_eq!(policy.classify(ActionKind::Attack, 1), Priority::High);
        assert_eq!(policy.classify(ActionKind::Sign, 1), Priority::High);
        assert_eq!(policy.classify(ActionKind::Animation, 1), Priority::Medium);
        assert_eq!(policy.classify(ActionKind::Movement, 1), Priority::Low);
    }

    #[test]
    fn test_override_leaves_other_kinds() {
        let policy = PriorityPolicy::new().with_priority(ActionKind::Movement, Priority::High);
        assert_eq!(policy.classify(ActionKind::Movement, 7), Priority::High);
        assert_eq!(policy.classify(ActionKind::Defense, 7), Priority::Critical);
    }

    #[test]
    fn test_drain_order() {
        let order: Vec<_> = Priority::ALL.iter().map(|p| p.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert!(Priority::Critical < Priority::Low);
    }
}
