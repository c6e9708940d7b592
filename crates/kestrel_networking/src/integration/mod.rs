//! # Combat Integration
//!
//! The server-facing surface: [`CombatSystem`] ties the dispatcher, the
//! interpolation engine and the scripting bridge together behind one
//! lifecycle, drives the dispatcher from a background tick thread, and
//! reports health.

mod config;
mod facade;
mod health;
pub mod tick;

pub use config::{CombatSystemConfig, ConfigError, RelayConfig};
pub use facade::{CombatSystem, FacadeState, SystemError, PROCESSING_THREAD_NAME};
pub use health::{HealthIssue, StatusReport, SystemInfo, HIGH_LOAD_THRESHOLD};
pub use tick::{TickPacer, TickStats};
