//! # Relay Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) yields a working relay.
//!
//! ```toml
//! [combat]
//! processing_interval_ms = 8
//! max_queue_size = 2000
//!
//! [interpolation]
//! type = "catmull_rom"
//! duration = 0.12
//! ```

use crate::interpolation::InterpolationConfig;
use kestrel_combat::{OptimizerConfig, PriorityPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for [`RelayConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// One or more values are out of range.
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Combat-side tuning for [`CombatSystem`](super::CombatSystem).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSystemConfig {
    /// Tick interval of the processing thread.
    pub processing_interval_ms: u64,
    /// Per-pass processing budget.
    pub max_processing_time_ms: u64,
    /// Combined capacity of the four tiers.
    pub max_queue_size: usize,
    /// Actions drained per tier per pass.
    pub batch_size: usize,
    /// Actions older than this are evicted unprocessed.
    pub max_action_age_ms: u64,
    /// Feed pass timings into the performance monitor.
    pub enable_performance_monitoring: bool,
    /// Samples retained by the performance monitor.
    pub monitor_capacity: usize,
}

impl Default for CombatSystemConfig {
    fn default() -> Self {
        Self {
            processing_interval_ms: 16,
            max_processing_time_ms: 16,
            max_queue_size: 1000,
            batch_size: 50,
            max_action_age_ms: 5000,
            enable_performance_monitoring: true,
            monitor_capacity: kestrel_combat::monitor::DEFAULT_MONITOR_CAPACITY,
        }
    }
}

impl CombatSystemConfig {
    /// Larger queues and batches at 120Hz.
    #[must_use]
    pub fn high_performance() -> Self {
        Self {
            processing_interval_ms: 8,
            max_processing_time_ms: 5,
            max_queue_size: 2000,
            batch_size: 100,
            ..Self::default()
        }
    }

    /// Small queues drained at 250Hz.
    #[must_use]
    pub fn low_latency() -> Self {
        Self {
            processing_interval_ms: 4,
            max_processing_time_ms: 2,
            max_queue_size: 500,
            batch_size: 25,
            ..Self::default()
        }
    }

    /// Tick interval as a [`Duration`].
    #[must_use]
    pub const fn processing_interval(&self) -> Duration {
        Duration::from_millis(self.processing_interval_ms)
    }

    /// Every violated rule, in field order.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.processing_interval_ms == 0 {
            errors.push("processing_interval_ms must be greater than 0".to_owned());
        }
        if self.max_processing_time_ms == 0 {
            errors.push("max_processing_time_ms must be greater than 0".to_owned());
        }
        if self.max_queue_size < 4 {
            errors.push("max_queue_size must be at least 4".to_owned());
        }
        if self.batch_size == 0 {
            errors.push("batch_size must be greater than 0".to_owned());
        }
        if self.max_action_age_ms == 0 {
            errors.push("max_action_age_ms must be greater than 0".to_owned());
        }
        if self.enable_performance_monitoring && self.monitor_capacity == 0 {
            errors.push("monitor_capacity must be greater than 0 when monitoring".to_owned());
        }
        errors
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] listing every violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Dispatcher settings derived from this config, with the default policy.
    #[must_use]
    pub fn to_optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            max_queue_size: self.max_queue_size,
            batch_size: self.batch_size,
            max_processing_time: Duration::from_millis(self.max_processing_time_ms),
            max_action_age: Duration::from_millis(self.max_action_age_ms),
            policy: PriorityPolicy::default(),
        }
    }
}

/// Top-level relay configuration file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Dispatcher and tick thread.
    pub combat: CombatSystemConfig,
    /// Interpolation engine.
    pub interpolation: InterpolationConfig,
}

impl RelayConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] in addition to [`RelayConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] listing every violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.combat.validation_errors();
        let interpolation = &self.interpolation;
        if !interpolation.duration.is_finite() || interpolation.duration <= 0.0 {
            errors.push("interpolation.duration must be finite and greater than 0".to_owned());
        }
        if !(0.0..=1.0).contains(&interpolation.smoothing) {
            errors.push("interpolation.smoothing must be within [0, 1]".to_owned());
        }
        if !interpolation.extrapolation_time.is_finite() || interpolation.extrapolation_time < 0.0 {
            errors.push("interpolation.extrapolation_time must be finite and not negative".to_owned());
        }
        if !interpolation.lag_compensation_time.is_finite()
            || interpolation.lag_compensation_time < 0.0
        {
            errors.push("interpolation.lag_compensation_time must be finite and not negative".to_owned());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
