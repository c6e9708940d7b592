//! # KESTREL Combat - The Action Dispatcher
//!
//! Accepts combat intents from network threads, buffers them in four bounded
//! priority tiers, and drains them in deterministic batches into the host's
//! scripting runtime.
//!
//! ## Data Flow
//!
//! ```text
//! network threads                     processing thread (one per server)
//!       │                                          │
//!       │ add_attack_action / add_defense_action   │ process_actions()
//!       ▼                                          ▼
//! ┌──────────────┐   ┌──────────────────────────────────────────┐
//! │ PriorityPolicy│──►│ Critical │ High │ Medium │ Low │ (bounded)│──► ScriptBridge
//! └──────────────┘   └──────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//!                        StatsRecorder (atomics)
//! ```
//!
//! ## Failure Model
//!
//! Nothing here aborts. Admission refusals are returned as [`Rejected`] and
//! counted; stale entries are evicted and counted; bridge failures are logged
//! and the batch moves on.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kestrel_combat::{CombatOptimizer, OptimizerConfig, RecordingBridge};
//! use std::sync::Arc;
//!
//! let optimizer = CombatOptimizer::with_system_clock(Arc::new(RecordingBridge::new()));
//! optimizer.initialize(OptimizerConfig::default())?;
//! optimizer.add_defense_action(7, 1, 41)?;
//! let report = optimizer.process_actions()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod action;
pub mod bridge;
pub mod builder;
pub mod codec;
pub mod error;
pub mod monitor;
pub mod optimizer;
pub mod priority;
pub mod queue;
pub mod stats;

pub use action::{ActionId, ActionKind, ActionPayload, CombatAction, PlayerId};
pub use bridge::{BridgeCall, RecordingBridge, ScriptBridge};
pub use builder::CombatActionBuilder;
pub use codec::{decode_frame, PayloadReader, PayloadWriter, MAX_FRAME_SIZE};
pub use error::{BridgeError, CodecError, CombatError, CombatResult, Rejected};
pub use monitor::{PerformanceMonitor, PerformanceSample, PerformanceSummary};
pub use optimizer::{CombatOptimizer, OptimizerConfig, OptimizerState, OptimizerStatus, ProcessReport};
pub use priority::{Priority, PriorityPolicy};
pub use queue::PriorityQueues;
pub use stats::{CombatStats, StatsRecorder};
