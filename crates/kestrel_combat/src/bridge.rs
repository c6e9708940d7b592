//! # Scripting Bridge Port
//!
//! The dispatcher does not mutate game state itself. Every forwarded action
//! becomes one synchronous call into the host's scripting runtime through
//! [`ScriptBridge`]:
//!
//! ```text
//! CombatOptimizer              host runtime
//! ┌──────────────┐            ┌──────────────────┐
//! │ Attack       │──────────► │ execute_attack   │
//! │ Defense      │──────────► │ execute_defense  │
//! │ Sign         │──────────► │ cast_sign        │
//! │ Animation    │──────────► │ play_*_animation │
//! │ Movement     │──x         └──────────────────┘
//! └──────────────┘
//! ```
//!
//! Calls are fire-and-forget from the dispatcher's point of view: an `Err`
//! is logged and the batch continues.

use crate::action::PlayerId;
use crate::error::BridgeError;
use kestrel_core::Vec4;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Game-mutation entry points provided by the scripting runtime.
pub trait ScriptBridge: Send + Sync {
    /// Loads the runtime. Called once by the integration layer.
    fn initialize(&self) -> Result<(), BridgeError> {
        Ok(())
    }

    /// Unloads the runtime.
    fn shutdown(&self) {}

    /// Resolves a weapon attack.
    fn execute_attack(
        &self,
        player: PlayerId,
        attack_type: u32,
        weapon_type: u32,
        target: Vec4,
    ) -> Result<(), BridgeError>;

    /// Resolves a defensive reaction.
    fn execute_defense(
        &self,
        player: PlayerId,
        defense_type: u32,
        incoming_attack_id: u32,
    ) -> Result<(), BridgeError>;

    /// Resolves a sign cast.
    fn cast_sign(&self, player: PlayerId, sign_type: u32, target: Vec4) -> Result<(), BridgeError>;

    /// Plays an attack animation.
    fn play_attack_animation(&self, player: PlayerId, animation_type: u32) -> Result<(), BridgeError>;

    /// Plays a defense animation.
    fn play_defense_animation(&self, player: PlayerId, animation_type: u32)
        -> Result<(), BridgeError>;
}

// ============================================================================
// RECORDING BRIDGE
// ============================================================================

/// One call received by a [`RecordingBridge`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BridgeCall {
    /// `execute_attack`
    Attack {
        /// Acting player.
        player: PlayerId,
        /// Attack id.
        attack_type: u32,
        /// Weapon id.
        weapon_type: u32,
        /// Aim point.
        target: Vec4,
    },
    /// `execute_defense`
    Defense {
        /// Acting player.
        player: PlayerId,
        /// Defense id.
        defense_type: u32,
        /// Attack being answered.
        incoming_attack_id: u32,
    },
    /// `cast_sign`
    Sign {
        /// Acting player.
        player: PlayerId,
        /// Sign id.
        sign_type: u32,
        /// Aim point.
        target: Vec4,
    },
    /// `play_attack_animation`
    AttackAnimation {
        /// Acting player.
        player: PlayerId,
        /// Animation id.
        animation_type: u32,
    },
    /// `play_defense_animation`
    DefenseAnimation {
        /// Acting player.
        player: PlayerId,
        /// Animation id.
        animation_type: u32,
    },
}

/// Bridge that records every call in arrival order.
///
/// Used by tests and by the demo relay when no scripting runtime is attached.
/// Can be switched to fail every call to exercise the fail-open path.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    calls: Mutex<Vec<BridgeCall>>,
    failing: AtomicBool,
    initialized: AtomicBool,
}

impl RecordingBridge {
    /// Creates an empty bridge that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// True between `initialize` and `shutdown`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    fn record(&self, call: BridgeCall, name: &'static str) -> Result<(), BridgeError> {
        self.calls.lock().push(call);
        if self.failing.load(Ordering::Relaxed) {
            Err(BridgeError::Rejected { call: name })
        } else {
            Ok(())
        }
    }
}

impl ScriptBridge for RecordingBridge {
    fn initialize(&self) -> Result<(), BridgeError> {
        self.initialized.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn shutdown(&self) {
        self.initialized.store(false, Ordering::Relaxed);
    }

    fn execute_attack(
        &self,
        player: PlayerId,
        attack_type: u32,
        weapon_type: u32,
        target: Vec4,
    ) -> Result<(), BridgeError> {
        self.record(
            BridgeCall::Attack {
                player,
                attack_type,
                weapon_type,
                target,
            },
            "execute_attack",
        )
    }

    fn execute_defense(
        &self,
        player: PlayerId,
        defense_type: u32,
        incoming_attack_id: u32,
    ) -> Result<(), BridgeError> {
        self.record(
            BridgeCall::Defense {
                player,
                defense_type,
                incoming_attack_id,
            },
            "execute_defense",
        )
    }

    fn cast_sign(&self, player: PlayerId, sign_type: u32, target: Vec4) -> Result<(), BridgeError> {
        self.record(
            BridgeCall::Sign {
                player,
                sign_type,
                target,
            },
            "cast_sign",
        )
    }

    fn play_attack_animation(&self, player: PlayerId, animation_type: u32) -> Result<(), BridgeError> {
        self.record(
            BridgeCall::AttackAnimation {
                player,
                animation_type,
            },
            "play_attack_animation",
        )
    }

    fn play_defense_animation(
        &self,
        player: PlayerId,
        animation_type: u32,
    ) -> Result<(), BridgeError> {
        self.record(
            BridgeCall::DefenseAnimation {
                player,
                animation_type,
            },
            "play_defense_animation",
        )
    }
}
