//! Value types of the interpolation engine.

use kestrel_core::{clamp, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Remote entity identifier (the owning player's id).
pub type EntityId = u32;

/// Curve family used to reconstruct motion between snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    /// Straight line between the bracketing pair.
    Linear,
    /// Cubic through the bracketing pair using its two neighbours.
    #[default]
    Cubic,
    /// Hermite spline with the snapshots' velocities as tangents.
    Hermite,
    /// Catmull-Rom spline.
    CatmullRom,
    /// Cubic Bezier over four consecutive snapshots.
    Bezier,
}

impl InterpolationKind {
    /// Snapshots required before this curve is used; below it Linear runs.
    #[must_use]
    pub const fn min_samples(self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Cubic | Self::Hermite | Self::CatmullRom | Self::Bezier => 4,
        }
    }

    /// Confidence reported by the higher-order curves.
    #[must_use]
    pub const fn base_confidence(self) -> f32 {
        match self {
            Self::Linear => 1.0,
            Self::Cubic | Self::Bezier => 0.8,
            Self::Hermite => 0.9,
            Self::CatmullRom => 0.85,
        }
    }
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Hermite => "hermite",
            Self::CatmullRom => "catmull_rom",
            Self::Bezier => "bezier",
        })
    }
}

/// Engine tuning. Times are in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Curve family.
    #[serde(rename = "type")]
    pub kind: InterpolationKind,
    /// Interpolation window; history older than twice this is pruned.
    pub duration: f32,
    /// Exponential smoothing toward the previous result, `[0, 1]`.
    pub smoothing: f32,
    /// Project past the newest snapshot when queried beyond it.
    pub enable_extrapolation: bool,
    /// Maximum projection horizon.
    pub extrapolation_time: f32,
    /// Advance control points by `velocity × lag_compensation_time`.
    pub enable_lag_compensation: bool,
    /// Lag compensation horizon.
    pub lag_compensation_time: f32,
    /// Blend jumpy samples with their predecessor on insertion.
    pub enable_jitter_reduction: bool,
    /// Distance between consecutive samples treated as jitter.
    pub jitter_threshold: f32,
    /// Retune `duration` and `smoothing` from reported network conditions.
    pub enable_adaptive_interpolation: bool,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            kind: InterpolationKind::Cubic,
            duration: 0.1,
            smoothing: 0.1,
            enable_extrapolation: true,
            extrapolation_time: 0.2,
            enable_lag_compensation: true,
            lag_compensation_time: 0.1,
            enable_jitter_reduction: true,
            jitter_threshold: 0.01,
            enable_adaptive_interpolation: true,
        }
    }
}

impl InterpolationConfig {
    /// Replaces out-of-range timings with their defaults and clamps
    /// `smoothing` to `[0, 1]`.
    ///
    /// `duration` must be finite and positive; the other horizons finite and
    /// non-negative.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let mut config = self;
        if !config.duration.is_finite() || config.duration <= 0.0 {
            config.duration = defaults.duration;
        }
        config.smoothing = clamp(config.smoothing, 0.0, 1.0);
        if !config.extrapolation_time.is_finite() || config.extrapolation_time < 0.0 {
            config.extrapolation_time = defaults.extrapolation_time;
        }
        if !config.lag_compensation_time.is_finite() || config.lag_compensation_time < 0.0 {
            config.lag_compensation_time = defaults.lag_compensation_time;
        }
        if config.jitter_threshold.is_nan() {
            config.jitter_threshold = defaults.jitter_threshold;
        }
        config
    }
}

/// One authoritative position sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSnapshot {
    /// Entity the sample belongs to.
    pub entity: EntityId,
    /// Position (`w = 1`).
    pub position: Vec4,
    /// Velocity (`w = 0`).
    pub velocity: Vec4,
    /// Heading in radians, blended along the shortest arc (wraps at ±π).
    /// Peers that send degrees or expect a plain linear blend must convert.
    pub rotation: f32,
    /// Receive time.
    pub timestamp: Instant,
    /// Sender-assigned sequence number.
    pub sequence: u32,
    /// Invalid samples are ignored.
    pub valid: bool,
    /// Set when the engine blended this sample on insertion.
    pub jitter_corrected: bool,
}

impl PositionSnapshot {
    /// Creates a valid sample.
    #[must_use]
    pub const fn new(
        entity: EntityId,
        position: Vec4,
        velocity: Vec4,
        rotation: f32,
        timestamp: Instant,
        sequence: u32,
    ) -> Self {
        Self {
            entity,
            position,
            velocity,
            rotation,
            timestamp,
            sequence,
            valid: true,
            jitter_corrected: false,
        }
    }
}

/// Result of a pose query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolatedPosition {
    /// Entity queried.
    pub entity: EntityId,
    /// Reconstructed position.
    pub position: Vec4,
    /// Reconstructed velocity.
    pub velocity: Vec4,
    /// Reconstructed heading in radians.
    pub rotation: f32,
    /// Trust in `[0, 1]`; zero means "no data", check before use.
    pub confidence: f32,
    /// Projected past the newest snapshot.
    pub extrapolated: bool,
    /// Built from a jitter-corrected snapshot.
    pub jitter_corrected: bool,
}

impl InterpolatedPosition {
    /// Zero-confidence result at the origin.
    #[must_use]
    pub const fn empty(entity: EntityId) -> Self {
        Self {
            entity,
            position: Vec4::ORIGIN,
            velocity: Vec4::ZERO,
            rotation: 0.0,
            confidence: 0.0,
            extrapolated: false,
            jitter_corrected: false,
        }
    }

    /// True if the result carries any information.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.confidence > 0.0
    }
}

/// Last reported network conditions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NetworkConditions {
    /// Round-trip latency in milliseconds.
    pub latency_ms: f32,
    /// Packet loss fraction.
    pub packet_loss: f32,
    /// Latency jitter in seconds.
    pub jitter: f32,
}

/// Engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InterpolationStats {
    /// Queries answered with data.
    pub total_interpolations: u64,
    /// Results projected past the newest snapshot.
    pub total_extrapolations: u64,
    /// Snapshots blended on insertion.
    pub jitter_corrections: u64,
    /// Queries that applied lag compensation.
    pub lag_compensations: u64,
    /// Snapshots that arrived with an older sequence than one already held.
    pub reordered_snapshots: u64,
    /// Snapshots dropped as invalid or duplicate.
    pub discarded_snapshots: u64,
    /// Rolling average query time.
    pub average_interpolation_us: f32,
    /// Slowest query.
    pub max_interpolation_us: f32,
    /// Mean jitter magnitude among corrected snapshots.
    pub average_jitter: f32,
    /// Largest jitter magnitude.
    pub max_jitter: f32,
    /// Mean reported latency.
    pub average_lag_ms: f32,
    /// Largest reported latency.
    pub max_lag_ms: f32,
    /// Network condition reports received.
    pub lag_samples: u64,
}

impl fmt::Display for InterpolationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interpolations={} extrapolations={} jitter_corrections={} lag_compensations={} \
             reordered={} discarded={} avg={:.1}us max={:.1}us jitter(avg={:.4} max={:.4}) \
             lag(avg={:.1}ms max={:.1}ms)",
            self.total_interpolations,
            self.total_extrapolations,
            self.jitter_corrections,
            self.lag_compensations,
            self.reordered_snapshots,
            self.discarded_snapshots,
            self.average_interpolation_us,
            self.max_interpolation_us,
            self.average_jitter,
            self.max_jitter,
            self.average_lag_ms,
            self.max_lag_ms,
        )
    }
}
