//! # KESTREL Networking - The Relay Core
//!
//! Server-side half of KESTREL: smooth remote motion and the facade that
//! drives the combat dispatcher.
//!
//! ## Architecture
//!
//! - **Interpolation**: per-entity snapshot history, five curve families,
//!   capped extrapolation, jitter blending, lag compensation and adaptive
//!   tuning from reported network conditions
//! - **Integration**: [`CombatSystem`] owns one dispatcher and one engine,
//!   runs the processing thread, decodes player input and reports health
//!
//! ```text
//! network threads ──► CombatSystem ──► CombatOptimizer ──► ScriptBridge
//!        │                 │  ▲
//!        │                 │  └── processing thread (fixed interval)
//!        └─ snapshots ──► PositionInterpolator ──► interpolate_all_positions
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use kestrel_combat::RecordingBridge;
//! use kestrel_networking::CombatSystem;
//! use std::sync::Arc;
//!
//! let system = CombatSystem::with_bridge(Arc::new(RecordingBridge::new()));
//! system.initialize()?;
//! system.start_processing()?;
//! system.execute_defense(7, 1, 41);
//! let poses = system.interpolate_all_positions(0.1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod integration;
pub mod interpolation;

pub use integration::{
    CombatSystem, CombatSystemConfig, ConfigError, FacadeState, HealthIssue, RelayConfig,
    StatusReport, SystemError, SystemInfo, TickStats,
};
pub use interpolation::{
    EntityId, InterpolatedPosition, InterpolationConfig, InterpolationKind, InterpolationStats,
    NetworkConditions, PositionInterpolator, PositionSnapshot,
};
