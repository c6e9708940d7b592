//! # Position Interpolation Engine
//!
//! Reconstructs smooth remote-entity motion from sparse, late and
//! out-of-order position snapshots.
//!
//! ## Pipeline
//!
//! ```text
//! add_snapshot ──► discard invalid / duplicate sequence
//!              ──► jitter check vs. time predecessor (blend 50/50 if jumpy)
//!              ──► insert in timestamp order
//!              ──► prune every history to (now - 2 × duration, now]
//!
//! interpolate(entity, offset)
//!              target = now - offset
//!              target past newest? ──yes──► extrapolate (confidence decays)
//!                                  ──no───► curve over the bracketing pair
//!              ──► smoothing toward previous result ──► cache ──► callback
//! ```
//!
//! ## Curves
//!
//! Linear uses the bracketing pair. Cubic, Hermite, Catmull-Rom and Bezier
//! use four control snapshots around the bracket and need at least four
//! snapshots; with fewer they fall back to Linear. All curves evaluate at
//! the elapsed-time ratio of the query inside its segment (Bezier: inside the
//! four-snapshot span) rather than at a fixed midpoint.
//!
//! ## Locking
//!
//! One mutex covers histories, the result cache, configuration and stats.
//! Callbacks live behind their own lock and always run after the engine lock
//! is released, so a callback may call back into the engine.

pub mod curves;
mod types;

pub use types::{
    EntityId, InterpolatedPosition, InterpolationConfig, InterpolationKind, InterpolationStats,
    NetworkConditions, PositionSnapshot,
};

use curves::lerp_angle;
use kestrel_core::{clamp, offset_instant, SharedClock, SystemClock, Vec4};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Rotation rate used for lag compensation. Angular velocity is not tracked
/// per entity, so headings are never advanced.
const ANGULAR_VELOCITY: f32 = 0.0;

/// Called with the new position every time a query updates the cache.
pub type PositionCallback = Arc<dyn Fn(EntityId, Vec4) + Send + Sync>;

/// Called with the jump magnitude every time a snapshot is jitter-corrected.
pub type JitterCallback = Arc<dyn Fn(EntityId, f32) + Send + Sync>;

struct EngineState {
    config: InterpolationConfig,
    histories: BTreeMap<EntityId, Vec<PositionSnapshot>>,
    current: HashMap<EntityId, InterpolatedPosition>,
    network: NetworkConditions,
    stats: InterpolationStats,
}

#[derive(Default)]
struct Callbacks {
    position_updated: Option<PositionCallback>,
    jitter_detected: Option<JitterCallback>,
}

/// Per-entity snapshot history with curve-based pose reconstruction.
pub struct PositionInterpolator {
    clock: SharedClock,
    state: Mutex<EngineState>,
    callbacks: RwLock<Callbacks>,
}

impl PositionInterpolator {
    /// Creates an empty engine.
    #[must_use]
    pub fn new(config: InterpolationConfig, clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(EngineState {
                config: config.sanitized(),
                histories: BTreeMap::new(),
                current: HashMap::new(),
                network: NetworkConditions::default(),
                stats: InterpolationStats::default(),
            }),
            callbacks: RwLock::new(Callbacks::default()),
        }
    }

    /// Creates an engine with default tuning on the system clock.
    #[must_use]
    pub fn with_system_clock() -> Self {
        Self::new(InterpolationConfig::default(), SystemClock::shared())
    }

    // ------------------------------------------------------------------
    // Snapshot intake
    // ------------------------------------------------------------------

    /// Records a snapshot timestamped now.
    pub fn add_position_snapshot(
        &self,
        entity: EntityId,
        position: Vec4,
        velocity: Vec4,
        rotation: f32,
        sequence: u32,
    ) -> bool {
        let snapshot = PositionSnapshot::new(
            entity,
            position,
            velocity,
            rotation,
            self.clock.now(),
            sequence,
        );
        self.add_snapshot(snapshot)
    }

    /// Inserts a snapshot into its entity's history.
    ///
    /// Returns `false` if the snapshot was discarded (invalid, non-finite, or
    /// a sequence number the history already holds).
    pub fn add_snapshot(&self, snapshot: PositionSnapshot) -> bool {
        let mut snapshot = snapshot;
        let jitter = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if !snapshot.valid || !snapshot.position.is_finite() || !snapshot.velocity.is_finite() {
                state.stats.discarded_snapshots += 1;
                return false;
            }

            let config = state.config;
            let history = state.histories.entry(snapshot.entity).or_default();
            if history.iter().any(|s| s.sequence == snapshot.sequence) {
                state.stats.discarded_snapshots += 1;
                trace!(entity = snapshot.entity, sequence = snapshot.sequence, "duplicate snapshot");
                return false;
            }
            if history.iter().any(|s| sequence_newer(s.sequence, snapshot.sequence)) {
                state.stats.reordered_snapshots += 1;
            }

            let index = history.partition_point(|s| s.timestamp <= snapshot.timestamp);
            let mut jitter = None;
            if config.enable_jitter_reduction && index > 0 {
                let previous = history[index - 1].position;
                let magnitude = snapshot.position.distance(previous);
                if magnitude > config.jitter_threshold {
                    snapshot.position = previous.lerp(snapshot.position, 0.5);
                    snapshot.jitter_corrected = true;
                    jitter = Some(magnitude);
                }
            }
            history.insert(index, snapshot);

            if let Some(magnitude) = jitter {
                let stats = &mut state.stats;
                stats.jitter_corrections += 1;
                #[allow(clippy::cast_precision_loss)]
                let n = stats.jitter_corrections as f32;
                stats.average_jitter += (magnitude - stats.average_jitter) / n;
                stats.max_jitter = stats.max_jitter.max(magnitude);
            }

            prune(&mut state.histories, self.clock.now(), config.duration);
            jitter
        };

        if let Some(magnitude) = jitter {
            trace!(entity = snapshot.entity, magnitude, "jitter corrected");
            let callback = self.callbacks.read().jitter_detected.clone();
            if let Some(callback) = callback {
                callback(snapshot.entity, magnitude);
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Reconstructs the pose of `entity` at `now - time_offset` seconds.
    ///
    /// Fewer than two snapshots yields a zero-confidence default that is not
    /// cached.
    pub fn interpolate(&self, entity: EntityId, time_offset: f32) -> InterpolatedPosition {
        let started = Instant::now();
        let result = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let config = state.config;
            let Some(history) = state.histories.get(&entity) else {
                return InterpolatedPosition::empty(entity);
            };
            if history.len() < 2 {
                return InterpolatedPosition::empty(entity);
            }

            let target = offset_instant(self.clock.now(), time_offset);
            let newest = history[history.len() - 1].timestamp;
            let mut result = if config.enable_extrapolation && target > newest {
                state.stats.total_extrapolations += 1;
                let horizon = target.duration_since(newest).as_secs_f32();
                extrapolate_history(entity, history, horizon, &config)
            } else {
                if config.enable_lag_compensation && config.lag_compensation_time > 0.0 {
                    state.stats.lag_compensations += 1;
                }
                reconstruct(entity, history, target, &config)
            };

            if config.smoothing > 0.0 {
                if let Some(previous) = state.current.get(&entity) {
                    result.position = result.position.lerp(previous.position, config.smoothing);
                    result.velocity = result.velocity.lerp(previous.velocity, config.smoothing);
                    result.rotation = lerp_angle(result.rotation, previous.rotation, config.smoothing);
                }
            }
            state.current.insert(entity, result);

            let stats = &mut state.stats;
            stats.total_interpolations += 1;
            let us = started.elapsed().as_secs_f32() * 1_000_000.0;
            stats.average_interpolation_us = if stats.total_interpolations == 1 {
                us
            } else {
                (stats.average_interpolation_us * 15.0 + us) / 16.0
            };
            stats.max_interpolation_us = stats.max_interpolation_us.max(us);
            result
        };

        let callback = self.callbacks.read().position_updated.clone();
        if let Some(callback) = callback {
            callback(entity, result.position);
        }
        result
    }

    /// Projects `entity` `time_offset` seconds past its newest snapshot.
    ///
    /// The projection horizon is capped at `extrapolation_time`; confidence
    /// falls linearly to zero as `time_offset` approaches it. Not cached.
    pub fn extrapolate(&self, entity: EntityId, time_offset: f32) -> InterpolatedPosition {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.config.enable_extrapolation {
            return InterpolatedPosition::empty(entity);
        }
        let Some(history) = state.histories.get(&entity) else {
            return InterpolatedPosition::empty(entity);
        };
        if history.len() < 2 {
            return InterpolatedPosition::empty(entity);
        }
        state.stats.total_extrapolations += 1;
        extrapolate_history(entity, history, time_offset, &state.config)
    }

    /// Interpolates every tracked entity, keeping results with confidence > 0.
    pub fn interpolate_all(&self, time_offset: f32) -> Vec<InterpolatedPosition> {
        let entities: Vec<EntityId> = self.state.lock().histories.keys().copied().collect();
        entities
            .into_iter()
            .map(|entity| self.interpolate(entity, time_offset))
            .filter(InterpolatedPosition::is_usable)
            .collect()
    }

    /// Last cached position, or the origin.
    #[must_use]
    pub fn current_position(&self, entity: EntityId) -> Vec4 {
        self.state
            .lock()
            .current
            .get(&entity)
            .map_or(Vec4::ORIGIN, |r| r.position)
    }

    /// Last cached velocity, or zero.
    #[must_use]
    pub fn current_velocity(&self, entity: EntityId) -> Vec4 {
        self.state
            .lock()
            .current
            .get(&entity)
            .map_or(Vec4::ZERO, |r| r.velocity)
    }

    /// Last cached heading, or zero.
    #[must_use]
    pub fn current_rotation(&self, entity: EntityId) -> f32 {
        self.state
            .lock()
            .current
            .get(&entity)
            .map_or(0.0, |r| r.rotation)
    }

    /// True if `entity` has at least one snapshot.
    #[must_use]
    pub fn has_position_data(&self, entity: EntityId) -> bool {
        self.state.lock().histories.contains_key(&entity)
    }

    /// Snapshots held for `entity`.
    #[must_use]
    pub fn snapshot_count(&self, entity: EntityId) -> usize {
        self.state.lock().histories.get(&entity).map_or(0, Vec::len)
    }

    /// Entities with at least one snapshot.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.state.lock().histories.len()
    }

    /// Removes every trace of `entity` (disconnect). Returns whether it was
    /// tracked.
    pub fn cleanup_entity(&self, entity: EntityId) -> bool {
        let mut state = self.state.lock();
        let had_history = state.histories.remove(&entity).is_some();
        let had_result = state.current.remove(&entity).is_some();
        had_history || had_result
    }

    /// Removes every entity.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.histories.clear();
        state.current.clear();
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> InterpolationConfig {
        self.state.lock().config
    }

    /// Replaces the configuration; see [`InterpolationConfig::sanitized`].
    pub fn set_config(&self, config: InterpolationConfig) {
        self.state.lock().config = config.sanitized();
    }

    /// Selects the curve family.
    pub fn set_kind(&self, kind: InterpolationKind) {
        self.state.lock().config.kind = kind;
    }

    /// Sets the interpolation window in seconds. Non-finite or non-positive
    /// values are ignored.
    pub fn set_duration(&self, duration: f32) {
        if duration.is_finite() && duration > 0.0 {
            self.state.lock().config.duration = duration;
        }
    }

    /// Sets the smoothing factor, clamped to `[0, 1]`.
    pub fn set_smoothing(&self, smoothing: f32) {
        self.state.lock().config.smoothing = clamp(smoothing, 0.0, 1.0);
    }

    /// Enables or disables extrapolation and sets its horizon. Non-finite
    /// horizons leave the current one in place.
    pub fn set_extrapolation(&self, enabled: bool, extrapolation_time: f32) {
        let mut state = self.state.lock();
        state.config.enable_extrapolation = enabled;
        if extrapolation_time.is_finite() {
            state.config.extrapolation_time = extrapolation_time.max(0.0);
        }
    }

    /// Enables or disables lag compensation and sets its horizon. Non-finite
    /// horizons leave the current one in place.
    pub fn set_lag_compensation(&self, enabled: bool, lag_compensation_time: f32) {
        let mut state = self.state.lock();
        state.config.enable_lag_compensation = enabled;
        if lag_compensation_time.is_finite() {
            state.config.lag_compensation_time = lag_compensation_time.max(0.0);
        }
    }

    /// Enables or disables jitter reduction and sets its threshold.
    pub fn set_jitter_reduction(&self, enabled: bool, jitter_threshold: f32) {
        let mut state = self.state.lock();
        state.config.enable_jitter_reduction = enabled;
        state.config.jitter_threshold = jitter_threshold.max(0.0);
    }

    /// Enables or disables adaptive tuning.
    pub fn set_adaptive(&self, enabled: bool) {
        self.state.lock().config.enable_adaptive_interpolation = enabled;
    }

    // ------------------------------------------------------------------
    // Network adaptation
    // ------------------------------------------------------------------

    /// Stores new network conditions; adapts immediately when adaptive
    /// tuning is enabled.
    pub fn update_network_conditions(&self, latency_ms: f32, packet_loss: f32, jitter: f32) {
        let mut state = self.state.lock();
        state.network = NetworkConditions {
            latency_ms,
            packet_loss,
            jitter,
        };

        let stats = &mut state.stats;
        stats.lag_samples += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = stats.lag_samples as f32;
        stats.average_lag_ms += (latency_ms - stats.average_lag_ms) / n;
        stats.max_lag_ms = stats.max_lag_ms.max(latency_ms);

        if state.config.enable_adaptive_interpolation {
            adapt(&mut state);
        }
    }

    /// Retunes `duration` and `smoothing` from the last reported conditions.
    ///
    /// High latency (> 100ms) stretches the window ×1.1 up to 0.2s, low
    /// latency (< 20ms) shrinks it ×0.9 down to 0.05s. High jitter (> 0.01)
    /// raises smoothing ×1.2 up to 0.5, low jitter (< 0.001) lowers it ×0.8
    /// down to 0.01.
    pub fn adapt_to_network_conditions(&self) {
        adapt(&mut self.state.lock());
    }

    /// Last reported network conditions.
    #[must_use]
    pub fn network_conditions(&self) -> NetworkConditions {
        self.state.lock().network
    }

    // ------------------------------------------------------------------
    // Callbacks & statistics
    // ------------------------------------------------------------------

    /// Installs the position-updated callback.
    pub fn set_position_updated_callback<F>(&self, callback: F)
    where
        F: Fn(EntityId, Vec4) + Send + Sync + 'static,
    {
        self.callbacks.write().position_updated = Some(Arc::new(callback));
    }

    /// Installs the jitter-detected callback.
    pub fn set_jitter_detected_callback<F>(&self, callback: F)
    where
        F: Fn(EntityId, f32) + Send + Sync + 'static,
    {
        self.callbacks.write().jitter_detected = Some(Arc::new(callback));
    }

    /// Removes both callbacks.
    pub fn clear_callbacks(&self) {
        *self.callbacks.write() = Callbacks::default();
    }

    /// Copies the counters.
    #[must_use]
    pub fn stats(&self) -> InterpolationStats {
        self.state.lock().stats
    }

    /// Zeroes the counters.
    pub fn reset_stats(&self) {
        self.state.lock().stats = InterpolationStats::default();
    }

    /// Logs the counters at info level.
    pub fn log_stats(&self) {
        let (stats, entities, config) = {
            let state = self.state.lock();
            (state.stats, state.histories.len(), state.config)
        };
        info!(
            entities,
            kind = %config.kind,
            duration = config.duration,
            smoothing = config.smoothing,
            "interpolation: {stats}"
        );
    }
}

impl fmt::Debug for PositionInterpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PositionInterpolator")
            .field("config", &state.config)
            .field("entities", &state.histories.len())
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

/// True if sequence `a` is newer than `b`, allowing for wrap-around.
fn sequence_newer(a: u32, b: u32) -> bool {
    a != b && a.wrapping_sub(b) < 1 << 31
}

/// Drops samples at or before `now - 2 × duration`, then empty histories.
fn prune(histories: &mut BTreeMap<EntityId, Vec<PositionSnapshot>>, now: Instant, duration: f32) {
    let Ok(window) = Duration::try_from_secs_f32(2.0 * duration) else {
        return;
    };
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    histories.retain(|_, history| {
        history.retain(|s| s.timestamp > cutoff);
        !history.is_empty()
    });
}

fn adapt(state: &mut EngineState) {
    let NetworkConditions {
        latency_ms, jitter, ..
    } = state.network;
    let config = &mut state.config;

    if latency_ms > 100.0 {
        config.duration = (config.duration * 1.1).min(0.2);
    } else if latency_ms < 20.0 {
        config.duration = (config.duration * 0.9).max(0.05);
    }

    if jitter > 0.01 {
        config.smoothing = (config.smoothing * 1.2).min(0.5);
    } else if jitter < 0.001 {
        config.smoothing = (config.smoothing * 0.8).max(0.01);
    }

    debug!(
        latency_ms,
        jitter,
        duration = config.duration,
        smoothing = config.smoothing,
        "interpolation adapted"
    );
}

/// Position of `t` between `start` and `end`, clamped to `[0, 1]`.
/// Coincident timestamps resolve to the later sample.
fn segment_t(start: Instant, end: Instant, target: Instant) -> f32 {
    let span = end.saturating_duration_since(start).as_secs_f32();
    if span <= 0.0 {
        return 1.0;
    }
    clamp(target.saturating_duration_since(start).as_secs_f32() / span, 0.0, 1.0)
}

/// Indices of the four control snapshots around segment `i`.
fn control_indices(i: usize, len: usize) -> [usize; 4] {
    [i.saturating_sub(1), i, i + 1, (i + 2).min(len - 1)]
}

fn reconstruct(
    entity: EntityId,
    history: &[PositionSnapshot],
    target: Instant,
    config: &InterpolationConfig,
) -> InterpolatedPosition {
    let len = history.len();
    let i = history
        .partition_point(|s| s.timestamp <= target)
        .saturating_sub(1)
        .min(len - 2);
    let (a, b) = (&history[i], &history[i + 1]);
    let t = segment_t(a.timestamp, b.timestamp, target);

    let lag = if config.enable_lag_compensation {
        config.lag_compensation_time
    } else {
        0.0
    };
    let compensated = |s: &PositionSnapshot| s.position + s.velocity * lag;

    let kind = if len >= config.kind.min_samples() {
        config.kind
    } else {
        InterpolationKind::Linear
    };
    let (position, confidence) = match kind {
        InterpolationKind::Linear => (
            compensated(a).lerp(compensated(b), t),
            1.0 - (t - 0.5).abs() * 2.0,
        ),
        InterpolationKind::Cubic => {
            let points = control_indices(i, len).map(|k| compensated(&history[k]));
            (curves::cubic_vec(points, t), kind.base_confidence())
        }
        InterpolationKind::CatmullRom => {
            let points = control_indices(i, len).map(|k| compensated(&history[k]));
            (curves::catmull_rom_vec(points, t), kind.base_confidence())
        }
        InterpolationKind::Hermite => {
            let dt = b.timestamp.saturating_duration_since(a.timestamp).as_secs_f32();
            (
                curves::hermite_vec(compensated(a), a.velocity * dt, compensated(b), b.velocity * dt, t),
                kind.base_confidence(),
            )
        }
        InterpolationKind::Bezier => {
            let indices = control_indices(i, len);
            let span_t = segment_t(history[indices[0]].timestamp, history[indices[3]].timestamp, target);
            let points = indices.map(|k| compensated(&history[k]));
            (curves::bezier_vec(points, span_t), kind.base_confidence())
        }
    };

    InterpolatedPosition {
        entity,
        position,
        velocity: a.velocity.lerp(b.velocity, t),
        rotation: lerp_angle(a.rotation, b.rotation, t) + ANGULAR_VELOCITY * lag,
        confidence: clamp(confidence, 0.0, 1.0),
        extrapolated: false,
        jitter_corrected: a.jitter_corrected || b.jitter_corrected,
    }
}

fn extrapolate_history(
    entity: EntityId,
    history: &[PositionSnapshot],
    time_offset: f32,
    config: &InterpolationConfig,
) -> InterpolatedPosition {
    let last = &history[history.len() - 1];
    let previous = &history[history.len() - 2];

    let velocity = if last.velocity.is_zero() {
        let dt = last.timestamp.saturating_duration_since(previous.timestamp).as_secs_f32();
        if dt > 0.0 {
            let delta = last.position - previous.position;
            Vec4::direction(delta.x / dt, delta.y / dt, delta.z / dt)
        } else {
            Vec4::ZERO
        }
    } else {
        last.velocity
    };

    let limit = config.extrapolation_time.max(0.0);
    let offset = time_offset.max(0.0);
    let factor = if limit > 0.0 {
        clamp(offset / limit, 0.0, 1.0)
    } else {
        1.0
    };

    InterpolatedPosition {
        entity,
        position: last.position + velocity * offset.min(limit),
        velocity,
        rotation: last.rotation,
        confidence: 1.0 - factor,
        extrapolated: true,
        jitter_corrected: last.jitter_corrected,
    }
}
