//! # Combat Actions
//!
//! One record per player intent. The payload is typed per kind, so the
//! dispatcher never re-parses bytes on the hot path; bytes only exist at the
//! network edge (see [`crate::codec`]).
//!
//! Lifecycle:
//!
//! ```text
//! created ──► admitted into tier ──► forwarded + marked processed
//!    │                  │
//!    └─► rejected       └─► evicted (older than max age)
//! ```

use crate::priority::Priority;
use kestrel_core::Vec4;
use std::fmt;
use std::time::Instant;

/// Player / actor identifier.
pub type PlayerId = u32;

/// Process-unique, increasing action identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of combat intent. Discriminants are the wire tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Weapon attack.
    Attack = 0,
    /// Block / parry / dodge.
    Defense = 1,
    /// Sign (spell) cast.
    Sign = 2,
    /// Cosmetic animation.
    Animation = 3,
    /// Position update.
    Movement = 4,
}

impl ActionKind {
    /// Number of kinds.
    pub const COUNT: usize = 5;

    /// All kinds in tag order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Attack,
        Self::Defense,
        Self::Sign,
        Self::Animation,
        Self::Movement,
    ];

    /// Index into per-kind tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Wire tag.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Kind for a wire tag.
    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Attack),
            1 => Some(Self::Defense),
            2 => Some(Self::Sign),
            3 => Some(Self::Animation),
            4 => Some(Self::Movement),
            _ => None,
        }
    }

    /// Lowercase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::Sign => "sign",
            Self::Animation => "animation",
            Self::Movement => "movement",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific fields of an action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionPayload {
    /// Weapon attack at a point.
    Attack {
        /// Script-defined attack id (light, heavy...).
        attack_type: u32,
        /// Script-defined weapon id.
        weapon_type: u32,
        /// Aim point.
        target_position: Vec4,
    },
    /// Defensive reaction to an incoming attack.
    Defense {
        /// Script-defined defense id.
        defense_type: u32,
        /// Attack being answered.
        incoming_attack_id: u32,
    },
    /// Sign cast at a point.
    Sign {
        /// Script-defined sign id.
        sign_type: u32,
        /// Aim point.
        target_position: Vec4,
    },
    /// Position report.
    Movement {
        /// Reported position.
        position: Vec4,
        /// Reported velocity.
        velocity: Vec4,
    },
    /// Cosmetic animation.
    Animation {
        /// Script-defined animation id.
        animation_type: u32,
        /// Plays the attack variant if true, the defense variant otherwise.
        is_attack: bool,
    },
}

impl ActionPayload {
    /// Kind derived from the payload variant.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Attack { .. } => ActionKind::Attack,
            Self::Defense { .. } => ActionKind::Defense,
            Self::Sign { .. } => ActionKind::Sign,
            Self::Movement { .. } => ActionKind::Movement,
            Self::Animation { .. } => ActionKind::Animation,
        }
    }
}

/// One queued combat action.
#[derive(Clone, Debug, PartialEq)]
pub struct CombatAction {
    /// Identifier assigned by the dispatcher.
    pub id: ActionId,
    /// Acting player.
    pub owner: PlayerId,
    /// Tier, fixed at creation.
    pub priority: Priority,
    /// Kind-specific fields.
    pub payload: ActionPayload,
    /// Creation time, used for staleness eviction.
    pub created_at: Instant,
    processed: bool,
}

impl CombatAction {
    /// Creates an unprocessed action.
    #[must_use]
    pub const fn new(
        id: ActionId,
        owner: PlayerId,
        priority: Priority,
        payload: ActionPayload,
        created_at: Instant,
    ) -> Self {
        Self {
            id,
            owner,
            priority,
            payload,
            created_at,
            processed: false,
        }
    }

    /// Kind of this action.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    /// True once the dispatcher has forwarded this action.
    #[inline]
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        self.processed
    }

    /// Marks the action as forwarded.
    pub(crate) fn mark_processed(&mut self) {
        self.processed = true;
    }
}
