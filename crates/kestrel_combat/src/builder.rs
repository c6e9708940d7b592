//! Fluent construction of combat actions.
//!
//! ```rust,ignore
//! let id = CombatActionBuilder::new(&optimizer)
//!     .player(7)
//!     .payload(ActionPayload::Defense { defense_type: 2, incoming_attack_id: 41 })
//!     .submit()?;
//! ```

use crate::action::{ActionId, ActionPayload, CombatAction, PlayerId};
use crate::error::Rejected;
use crate::optimizer::CombatOptimizer;
use crate::priority::Priority;
use kestrel_core::Vec4;
use std::time::Instant;

/// Builds a [`CombatAction`] against a dispatcher.
///
/// Unset fields default to player 0, an origin-to-origin movement, the
/// dispatcher's policy tier, and the dispatcher clock's current time.
#[must_use]
pub struct CombatActionBuilder<'a> {
    optimizer: &'a CombatOptimizer,
    player: PlayerId,
    payload: ActionPayload,
    priority: Option<Priority>,
    timestamp: Option<Instant>,
}

impl<'a> CombatActionBuilder<'a> {
    /// Starts a builder bound to `optimizer`.
    pub fn new(optimizer: &'a CombatOptimizer) -> Self {
        Self {
            optimizer,
            player: 0,
            payload: ActionPayload::Movement {
                position: Vec4::ORIGIN,
                velocity: Vec4::ZERO,
            },
            priority: None,
            timestamp: None,
        }
    }

    /// Sets the acting player.
    pub fn player(mut self, player: PlayerId) -> Self {
        self.player = player;
        self
    }

    /// Sets the payload (and therefore the kind).
    pub fn payload(mut self, payload: ActionPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Overrides the tier the policy would assign.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Overrides the creation time (replays, tests).
    pub fn timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds the action, reserving an id from the dispatcher.
    pub fn build(self) -> CombatAction {
        let priority = self
            .priority
            .unwrap_or_else(|| self.optimizer.classify(self.player, &self.payload));
        let created_at = self.timestamp.unwrap_or_else(|| self.optimizer.now());
        CombatAction::new(
            self.optimizer.next_action_id(),
            self.player,
            priority,
            self.payload,
            created_at,
        )
    }

    /// Builds the action and submits it.
    ///
    /// # Errors
    ///
    /// Any admission [`Rejected`] reason.
    pub fn submit(self) -> Result<ActionId, Rejected> {
        let optimizer = self.optimizer;
        optimizer.submit(self.build())
    }
}
