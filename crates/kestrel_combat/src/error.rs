//! # Combat Error Types
//!
//! Admission rejections and bridge failures are ordinary values here: a
//! rejected action is counted and dropped, a failed bridge call is logged and
//! the batch moves on. Only lifecycle misuse surfaces as [`CombatError`].

use crate::priority::Priority;
use thiserror::Error;

/// Lifecycle and configuration errors of the dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombatError {
    /// `initialize` has not been called yet.
    #[error("combat optimizer is not initialized")]
    NotInitialized,

    /// The dispatcher was shut down; it cannot be restarted.
    #[error("combat optimizer has been shut down")]
    ShutDown,

    /// A processing pass is already running on another thread.
    #[error("a processing pass is already in progress")]
    AlreadyProcessing,

    /// Configuration rejected during initialization.
    #[error("invalid optimizer configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for dispatcher operations.
pub type CombatResult<T> = Result<T, CombatError>;

/// Why an action was not admitted into its tier.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// The dispatcher is uninitialized or shut down.
    #[error("dispatcher is not accepting actions")]
    NotAccepting,

    /// Aggregate occupancy crossed the shedding threshold for this tier.
    #[error("{tier} action shed at {occupancy}/{capacity} queued")]
    LoadShed {
        /// Tier of the refused action.
        tier: Priority,
        /// Total queued actions at admission time.
        occupancy: usize,
        /// Configured `max_queue_size`.
        capacity: usize,
    },

    /// The action's own tier is at capacity.
    #[error("{tier} queue full ({capacity} entries)")]
    TierFull {
        /// Tier of the refused action.
        tier: Priority,
        /// Capacity of that tier.
        capacity: usize,
    },
}

/// Failure reported by the scripting runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The script refused the call (bad target, cooldown, unknown id...).
    #[error("script rejected {call}")]
    Rejected {
        /// Bridge entry point that failed.
        call: &'static str,
    },

    /// The scripting runtime is not loaded.
    #[error("scripting runtime unavailable")]
    Unavailable,
}

/// Malformed binary action payload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before every field was read.
    #[error("payload truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required by the next field.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The leading tag names no known action kind.
    #[error("unknown action kind tag {0}")]
    UnknownKind(u32),
}
