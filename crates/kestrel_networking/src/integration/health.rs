//! Health telemetry of the combat facade.

use super::FacadeState;
use std::fmt;
use std::time::Duration;

/// Processing load above which [`HealthIssue::HighLoad`] is reported.
pub const HIGH_LOAD_THRESHOLD: f32 = 0.9;

/// Something an operator should look at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HealthIssue {
    /// The facade has not been initialized (or was shut down).
    NotInitialized,
    /// Queues are above 80% of capacity.
    Overloaded,
    /// Queue occupancy above [`HIGH_LOAD_THRESHOLD`].
    HighLoad(f32),
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("System not initialized"),
            Self::Overloaded => f.write_str("System overloaded"),
            Self::HighLoad(load) => write!(f, "High processing load: {:.1}%", load * 100.0),
        }
    }
}

/// Point-in-time view of the facade counters.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusReport {
    /// Lifecycle state.
    pub state: FacadeState,
    /// Queue occupancy, `[0, 1]`.
    pub load: f32,
    /// Completed processing passes.
    pub processed_passes: u64,
    /// Actions dropped by the dispatcher (shed, full, evicted).
    pub dropped_actions: u64,
    /// Admission calls refused at the facade.
    pub rejected_actions: u64,
    /// Rolling average pass time.
    pub average_processing_time: Duration,
    /// Actions currently queued.
    pub queued_actions: usize,
    /// Entities tracked by the interpolation engine.
    pub tracked_entities: usize,
    /// Current issues; empty when healthy.
    pub issues: Vec<HealthIssue>,
}

impl StatusReport {
    /// True when no issue is reported.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Combat System Status ===")?;
        writeln!(f, "State:              {}", self.state)?;
        writeln!(f, "Load:               {:.1}%", self.load * 100.0)?;
        writeln!(f, "Processed passes:   {}", self.processed_passes)?;
        writeln!(f, "Dropped actions:    {}", self.dropped_actions)?;
        writeln!(f, "Rejected actions:   {}", self.rejected_actions)?;
        writeln!(
            f,
            "Avg pass time:      {}us",
            self.average_processing_time.as_micros()
        )?;
        writeln!(f, "Queued actions:     {}", self.queued_actions)?;
        writeln!(f, "Tracked entities:   {}", self.tracked_entities)?;
        if self.issues.is_empty() {
            write!(f, "Health:             OK")
        } else {
            write!(f, "Health:             ")?;
            for (i, issue) in self.issues.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{issue}")?;
            }
            Ok(())
        }
    }
}

/// Static description of a facade and its tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemInfo {
    /// Crate version.
    pub version: &'static str,
    /// Tick interval of the processing thread.
    pub processing_interval: Duration,
    /// Per-pass processing budget.
    pub max_processing_time: Duration,
    /// Combined tier capacity.
    pub max_queue_size: usize,
    /// Actions drained per tier per pass.
    pub batch_size: usize,
    /// Whether pass timings feed the performance monitor.
    pub monitoring: bool,
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== KESTREL Combat System v{} ===", self.version)?;
        writeln!(f, "Processing interval: {}ms", self.processing_interval.as_millis())?;
        writeln!(f, "Max processing time: {}ms", self.max_processing_time.as_millis())?;
        writeln!(f, "Max queue size:      {}", self.max_queue_size)?;
        writeln!(f, "Batch size:          {}", self.batch_size)?;
        write!(
            f,
            "Monitoring:          {}",
            if self.monitoring { "enabled" } else { "disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_messages() {
        assert_eq!(HealthIssue::NotInitialized.to_string(), "System not initialized");
        assert_eq!(HealthIssue::Overloaded.to_string(), "System overloaded");
        assert_eq!(
            HealthIssue::HighLoad(0.95).to_string(),
            "High processing load: 95.0%"
        );
    }
}
