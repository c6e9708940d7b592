//! # Combat Optimizer
//!
//! The action dispatcher. Producers on any thread call the `add_*` methods;
//! one processing thread calls [`CombatOptimizer::process_actions`] per tick.
//!
//! ## Pass Structure
//!
//! ```text
//! process_actions()
//!   ├─ Critical: pop ≤ batch_size ─► forward each ─► mark processed
//!   ├─ High:     pop ≤ batch_size ─► forward each ─► mark processed
//!   ├─ Medium:   pop ≤ batch_size ─► forward each ─► mark processed
//!   ├─ Low:      pop ≤ batch_size ─► forward each ─► mark processed
//!   ├─ evict everything older than max_action_age (counted as dropped)
//!   └─ record pass duration (rolling average of 100, peak)
//! ```
//!
//! The queue lock is held only to pop a batch; bridge calls run outside it so
//! producers keep admitting while the batch executes.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──initialize──► Initialized ──shutdown──► Shutdown (terminal)
//! ```
//!
//! Scheduling is strict priority: sustained Critical load can starve Low.

use crate::action::{ActionId, ActionPayload, CombatAction, PlayerId};
use crate::bridge::ScriptBridge;
use crate::error::{BridgeError, CombatError, CombatResult, Rejected};
use crate::priority::{Priority, PriorityPolicy};
use crate::queue::PriorityQueues;
use crate::stats::{CombatStats, StatsRecorder};
use kestrel_core::{SharedClock, SystemClock, Vec4};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Default total queue capacity.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
/// Default per-tier batch size.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Default reporting budget for one pass (one frame at 60Hz).
pub const DEFAULT_MAX_PROCESSING_TIME: Duration = Duration::from_millis(16);
/// Default age after which a queued action is evicted.
pub const DEFAULT_MAX_ACTION_AGE: Duration = Duration::from_millis(5000);

/// Dispatcher configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Total capacity partitioned across the four tiers.
    pub max_queue_size: usize,
    /// Maximum actions popped from each tier per pass.
    pub batch_size: usize,
    /// Reporting budget; passes over it are logged, never cut short.
    pub max_processing_time: Duration,
    /// Queued actions older than this are evicted.
    pub max_action_age: Duration,
    /// Kind-to-tier mapping.
    pub policy: PriorityPolicy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_processing_time: DEFAULT_MAX_PROCESSING_TIME,
            max_action_age: DEFAULT_MAX_ACTION_AGE,
            policy: PriorityPolicy::default(),
        }
    }
}

impl OptimizerConfig {
    /// Checks that every size and budget is non-zero.
    ///
    /// # Errors
    ///
    /// [`CombatError::InvalidConfig`] naming the first zero field.
    pub fn validate(&self) -> CombatResult<()> {
        if self.max_queue_size == 0 {
            return Err(CombatError::InvalidConfig("max_queue_size must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(CombatError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.max_processing_time.is_zero() {
            return Err(CombatError::InvalidConfig("max_processing_time must be > 0".into()));
        }
        Ok(())
    }
}

/// Dispatcher lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizerState {
    /// Created, not accepting actions.
    Uninitialized,
    /// Accepting and processing actions.
    Initialized,
    /// Torn down; queues cleared, nothing accepted.
    Shutdown,
}

impl fmt::Display for OptimizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Shutdown => "shutdown",
        })
    }
}

/// Outcome of one processing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Actions popped and marked processed (bridge failures included).
    pub forwarded: usize,
    /// Bridge calls that returned an error.
    pub failed: usize,
    /// Stale actions evicted after the drain.
    pub evicted: usize,
    /// Wall-clock duration of the pass.
    pub elapsed: Duration,
}

/// Queue state guarded together with the lifecycle so admission and
/// shutdown cannot interleave.
struct Inner {
    state: OptimizerState,
    queues: PriorityQueues,
}

/// Clears the re-entrancy flag when a pass ends, even on unwind.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Priority-queued combat action dispatcher.
pub struct CombatOptimizer {
    bridge: Arc<dyn ScriptBridge>,
    clock: SharedClock,
    inner: Mutex<Inner>,
    config: RwLock<OptimizerConfig>,
    next_id: AtomicU64,
    processing: AtomicBool,
    stats: StatsRecorder,
}

impl CombatOptimizer {
    /// Creates an uninitialized dispatcher forwarding into `bridge`.
    #[must_use]
    pub fn new(bridge: Arc<dyn ScriptBridge>, clock: SharedClock) -> Self {
        let config = OptimizerConfig::default();
        Self {
            bridge,
            clock,
            inner: Mutex::new(Inner {
                state: OptimizerState::Uninitialized,
                queues: PriorityQueues::new(config.max_queue_size),
            }),
            config: RwLock::new(config),
            next_id: AtomicU64::new(1),
            processing: AtomicBool::new(false),
            stats: StatsRecorder::new(),
        }
    }

    /// Creates a dispatcher timed by the system clock.
    #[must_use]
    pub fn with_system_clock(bridge: Arc<dyn ScriptBridge>) -> Self {
        Self::new(bridge, SystemClock::shared())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Applies `config` and starts accepting actions.
    ///
    /// Calling this on an initialized dispatcher is a no-op.
    ///
    /// # Errors
    ///
    /// [`CombatError::ShutDown`] after shutdown, [`CombatError::InvalidConfig`]
    /// for zero sizes or budgets.
    pub fn initialize(&self, config: OptimizerConfig) -> CombatResult<()> {
        config.validate()?;
        let mut inner = self.inner.lock();
        match inner.state {
            OptimizerState::Initialized => {
                debug!("combat optimizer already initialized");
                return Ok(());
            }
            OptimizerState::Shutdown => return Err(CombatError::ShutDown),
            OptimizerState::Uninitialized => {}
        }
        inner.queues.resize(config.max_queue_size);
        *self.config.write() = config;
        inner.state = OptimizerState::Initialized;
        info!(
            max_queue_size = config.max_queue_size,
            batch_size = config.batch_size,
            max_processing_ms = u64::try_from(config.max_processing_time.as_millis()).unwrap_or(u64::MAX),
            "combat optimizer initialized"
        );
        Ok(())
    }

    /// Clears every queue and stops accepting actions for good.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if inner.state == OptimizerState::Shutdown {
            return;
        }
        let discarded = inner.queues.clear_all();
        inner.state = OptimizerState::Shutdown;
        info!(discarded, "combat optimizer shut down");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> OptimizerState {
        self.inner.lock().state
    }

    /// True while accepting actions.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state() == OptimizerState::Initialized
    }

    // ------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------

    /// Current time on the dispatcher's clock.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Reserves the next action id.
    #[inline]
    pub fn next_action_id(&self) -> ActionId {
        ActionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Tier the current policy assigns to `payload` from `owner`.
    #[must_use]
    pub fn classify(&self, owner: PlayerId, payload: &ActionPayload) -> Priority {
        self.config.read().policy.classify(payload.kind(), owner)
    }

    /// Creates an action timestamped now and admits it into its tier.
    ///
    /// # Errors
    ///
    /// [`Rejected`] if the dispatcher is not running, the tier is being shed,
    /// or the tier is full.
    pub fn add_action(&self, owner: PlayerId, payload: ActionPayload) -> Result<ActionId, Rejected> {
        let priority = self.classify(owner, &payload);
        let action = CombatAction::new(self.next_action_id(), owner, priority, payload, self.clock.now());
        self.submit(action)
    }

    /// Admits a prepared action as-is.
    ///
    /// # Errors
    ///
    /// See [`CombatOptimizer::add_action`].
    pub fn submit(&self, action: CombatAction) -> Result<ActionId, Rejected> {
        let id = action.id;
        let tier = action.priority;
        let kind = action.kind();
        let result = {
            let mut inner = self.inner.lock();
            if inner.state == OptimizerState::Initialized {
                inner.queues.admit(action)
            } else {
                Err(Rejected::NotAccepting)
            }
        };
        match result {
            Ok(()) => {
                self.stats.record_accepted();
                Ok(id)
            }
            Err(Rejected::NotAccepting) => Err(Rejected::NotAccepting),
            Err(rejected) => {
                self.stats.record_dropped(1);
                trace!(%id, %kind, %tier, %rejected, "action dropped at admission");
                Err(rejected)
            }
        }
    }

    /// Queues an attack.
    ///
    /// # Errors
    ///
    /// See [`CombatOptimizer::add_action`].
    pub fn add_attack_action(
        &self,
        player: PlayerId,
        attack_type: u32,
        weapon_type: u32,
        target_position: Vec4,
    ) -> Result<ActionId, Rejected> {
        self.add_action(
            player,
            ActionPayload::Attack {
                attack_type,
                weapon_type,
                target_position,
            },
        )
    }

    /// Queues a defense.
    ///
    /// # Errors
    ///
    /// See [`CombatOptimizer::add_action`].
    pub fn add_defense_action(
        &self,
        player: PlayerId,
        defense_type: u32,
        incoming_attack_id: u32,
    ) -> Result<ActionId, Rejected> {
        self.add_action(
            player,
            ActionPayload::Defense {
                defense_type,
                incoming_attack_id,
            },
        )
    }

    /// Queues a sign cast.
    ///
    /// # Errors
    ///
    /// See [`CombatOptimizer::add_action`].
    pub fn add_sign_action(
        &self,
        player: PlayerId,
        sign_type: u32,
        target_position: Vec4,
    ) -> Result<ActionId, Rejected> {
        self.add_action(
            player,
            ActionPayload::Sign {
                sign_type,
                target_position,
            },
        )
    }

    /// Queues a movement report.
    ///
    /// # Errors
    ///
    /// See [`CombatOptimizer::add_action`].
    pub fn add_movement_action(
        &self,
        player: PlayerId,
        position: Vec4,
        velocity: Vec4,
    ) -> Result<ActionId, Rejected> {
        self.add_action(player, ActionPayload::Movement { position, velocity })
    }

    /// Queues an animation.
    ///
    /// # Errors
    ///
    /// See [`CombatOptimizer::add_action`].
    pub fn add_animation_action(
        &self,
        player: PlayerId,
        animation_type: u32,
        is_attack: bool,
    ) -> Result<ActionId, Rejected> {
        self.add_action(
            player,
            ActionPayload::Animation {
                animation_type,
                is_attack,
            },
        )
    }

    // ------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------

    /// Runs one full pass: drain every tier, evict stale entries, record
    /// timing.
    ///
    /// # Errors
    ///
    /// [`CombatError::NotInitialized`] / [`CombatError::ShutDown`] outside the
    /// running state, [`CombatError::AlreadyProcessing`] if another pass is in
    /// progress.
    pub fn process_actions(&self) -> CombatResult<ProcessReport> {
        self.ensure_running()?;
        let _guard = PassGuard::acquire(&self.processing).ok_or(CombatError::AlreadyProcessing)?;
        let start = Instant::now();
        let config = *self.config.read();

        let mut report = ProcessReport::default();
        for tier in Priority::ALL {
            let batch = self.inner.lock().queues.pop_batch(tier, config.batch_size);
            self.forward_batch(batch, &mut report);
        }

        let now = self.clock.now();
        report.evicted = self
            .inner
            .lock()
            .queues
            .evict_older_than(now, config.max_action_age);
        if report.evicted > 0 {
            self.stats.record_dropped(report.evicted as u64);
            debug!(evicted = report.evicted, "stale actions evicted");
        }

        report.elapsed = start.elapsed();
        self.stats.record_pass(report.elapsed);
        if report.elapsed > config.max_processing_time {
            debug!(
                elapsed_us = u64::try_from(report.elapsed.as_micros()).unwrap_or(u64::MAX),
                budget_us = u64::try_from(config.max_processing_time.as_micros()).unwrap_or(u64::MAX),
                forwarded = report.forwarded,
                "processing pass over budget"
            );
        }
        Ok(report)
    }

    /// Drains one batch from a single tier without eviction or pass timing.
    ///
    /// # Errors
    ///
    /// Same as [`CombatOptimizer::process_actions`].
    pub fn process_tier(&self, tier: Priority) -> CombatResult<ProcessReport> {
        self.ensure_running()?;
        let _guard = PassGuard::acquire(&self.processing).ok_or(CombatError::AlreadyProcessing)?;
        let start = Instant::now();
        let batch_size = self.config.read().batch_size;
        let batch = self.inner.lock().queues.pop_batch(tier, batch_size);

        let mut report = ProcessReport::default();
        self.forward_batch(batch, &mut report);
        report.elapsed = start.elapsed();
        Ok(report)
    }

    fn ensure_running(&self) -> CombatResult<()> {
        match self.state() {
            OptimizerState::Initialized => Ok(()),
            OptimizerState::Uninitialized => Err(CombatError::NotInitialized),
            OptimizerState::Shutdown => Err(CombatError::ShutDown),
        }
    }

    fn forward_batch(&self, batch: Vec<CombatAction>, report: &mut ProcessReport) {
        let count = batch.len();
        for mut action in batch {
            if let Err(err) = self.forward(&action) {
                report.failed += 1;
                warn!(id = %action.id, kind = %action.kind(), owner = action.owner, %err, "bridge call failed");
            }
            action.mark_processed();
        }
        report.forwarded += count;
        self.stats.record_processed(count as u64);
    }

    /// Hands one action to the scripting bridge.
    fn forward(&self, action: &CombatAction) -> Result<(), BridgeError> {
        let player = action.owner;
        match action.payload {
            ActionPayload::Attack {
                attack_type,
                weapon_type,
                target_position,
            } => self
                .bridge
                .execute_attack(player, attack_type, weapon_type, target_position),
            ActionPayload::Defense {
                defense_type,
                incoming_attack_id,
            } => self
                .bridge
                .execute_defense(player, defense_type, incoming_attack_id),
            ActionPayload::Sign {
                sign_type,
                target_position,
            } => self.bridge.cast_sign(player, sign_type, target_position),
            ActionPayload::Animation {
                animation_type,
                is_attack: true,
            } => self.bridge.play_attack_animation(player, animation_type),
            ActionPayload::Animation {
                animation_type,
                is_attack: false,
            } => self.bridge.play_defense_animation(player, animation_type),
            ActionPayload::Movement { position, .. } => {
                // Movement reaches clients through the interpolation path.
                trace!(player, x = position.x, y = position.y, z = position.z, "movement processed");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Queue management
    // ------------------------------------------------------------------

    /// Entries queued in one tier.
    #[must_use]
    pub fn queue_len(&self, tier: Priority) -> usize {
        self.inner.lock().queues.len(tier)
    }

    /// Entries queued across all tiers.
    #[must_use]
    pub fn total_queue_len(&self) -> usize {
        self.inner.lock().queues.total_len()
    }

    /// Discards every entry of one tier. Discarded entries are not counted
    /// as dropped.
    pub fn clear_queue(&self, tier: Priority) -> usize {
        self.inner.lock().queues.clear(tier)
    }

    /// Discards every queued entry.
    pub fn clear_all_queues(&self) -> usize {
        self.inner.lock().queues.clear_all()
    }

    /// True once total occupancy exceeds 80% of capacity.
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.inner.lock().queues.is_overloaded()
    }

    /// Occupancy as a fraction of capacity in `[0, 1]`.
    #[must_use]
    pub fn processing_load(&self) -> f32 {
        self.inner.lock().queues.load()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> OptimizerConfig {
        *self.config.read()
    }

    /// Re-partitions the tiers. Zero is ignored.
    pub fn set_max_queue_size(&self, max_queue_size: usize) {
        if max_queue_size == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        inner.queues.resize(max_queue_size);
        self.config.write().max_queue_size = max_queue_size;
    }

    /// Sets the per-tier batch size. Zero is ignored.
    pub fn set_batch_size(&self, batch_size: usize) {
        if batch_size > 0 {
            self.config.write().batch_size = batch_size;
        }
    }

    /// Sets the reporting budget of a pass.
    pub fn set_max_processing_time(&self, budget: Duration) {
        self.config.write().max_processing_time = budget;
    }

    /// Sets the eviction age.
    pub fn set_max_action_age(&self, max_age: Duration) {
        self.config.write().max_action_age = max_age;
    }

    /// Replaces the kind-to-tier policy for future admissions.
    pub fn set_policy(&self, policy: PriorityPolicy) {
        self.config.write().policy = policy;
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Copies the counters. Never takes the queue lock.
    #[must_use]
    pub fn statistics(&self) -> CombatStats {
        self.stats.snapshot()
    }

    /// Dropped actions so far (rejected + evicted).
    #[must_use]
    pub fn dropped_actions(&self) -> u64 {
        self.stats.dropped()
    }

    /// Zeroes the counters.
    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Rolling average pass duration.
    #[must_use]
    pub fn average_processing_time(&self) -> Duration {
        Duration::from_micros(self.stats.snapshot().average_processing_us)
    }

    /// Longest pass observed.
    #[must_use]
    pub fn peak_processing_time(&self) -> Duration {
        Duration::from_micros(self.stats.snapshot().peak_processing_us)
    }

    /// Full status snapshot.
    #[must_use]
    pub fn status(&self) -> OptimizerStatus {
        let (state, queue_lengths, max_queue_size, load, overloaded) = {
            let inner = self.inner.lock();
            (
                inner.state,
                Priority::ALL.map(|tier| inner.queues.len(tier)),
                inner.queues.max_queue_size(),
                inner.queues.load(),
                inner.queues.is_overloaded(),
            )
        };
        OptimizerStatus {
            state,
            queue_lengths,
            max_queue_size,
            load,
            overloaded,
            stats: self.stats.snapshot(),
        }
    }

    /// Logs the status at info level.
    pub fn log_statistics(&self) {
        info!("combat optimizer: {}", self.status());
    }
}

impl fmt::Debug for CombatOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatOptimizer")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Point-in-time dispatcher status.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptimizerStatus {
    /// Lifecycle state.
    pub state: OptimizerState,
    /// Queued entries per tier, in drain order.
    pub queue_lengths: [usize; 4],
    /// Total capacity.
    pub max_queue_size: usize,
    /// Occupancy fraction.
    pub load: f32,
    /// Occupancy above 80%.
    pub overloaded: bool,
    /// Counters.
    pub stats: CombatStats,
}

impl fmt::Display for OptimizerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [critical, high, medium, low] = self.queue_lengths;
        write!(
            f,
            "{} queues[critical={critical} high={high} medium={medium} low={low}]/{} load={:.1}%{} | {}",
            self.state,
            self.max_queue_size,
            self.load * 100.0,
            if self.overloaded { " OVERLOADED" } else { "" },
            self.stats,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeCall, RecordingBridge};
    use kestrel_core::ManualClock;

    fn optimizer(max_queue_size: usize, batch_size: usize) -> (CombatOptimizer, Arc<RecordingBridge>, ManualClock) {
        let bridge = Arc::new(RecordingBridge::new());
        let clock = ManualClock::new();
        let optimizer = CombatOptimizer::new(bridge.clone(), clock.shared());
        optimizer
            .initialize(OptimizerConfig {
                max_queue_size,
                batch_size,
                ..OptimizerConfig::default()
            })
            .unwrap();
        (optimizer, bridge, clock)
    }

    #[test]
    fn test_rejects_before_initialize() {
        let optimizer = CombatOptimizer::with_system_clock(Arc::new(RecordingBridge::new()));
        assert_eq!(
            optimizer.add_defense_action(1, 1, 1),
            Err(Rejected::NotAccepting)
        );
        assert_eq!(optimizer.process_actions(), Err(CombatError::NotInitialized));
        assert_eq!(optimizer.statistics().dropped_actions, 0);
    }

    #[test]
    fn test_invalid_config() {
        let optimizer = CombatOptimizer::with_system_clock(Arc::new(RecordingBridge::new()));
        let config = OptimizerConfig {
            batch_size: 0,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            optimizer.initialize(config),
            Err(CombatError::InvalidConfig(_))
        ));
        assert_eq!(optimizer.state(), OptimizerState::Uninitialized);
    }

    #[test]
    fn test_ids_increase() {
        let (optimizer, _, _) = optimizer(100, 10);
        let a = optimizer.add_attack_action(1, 0, 0, Vec4::ORIGIN).unwrap();
        let b = optimizer.add_sign_action(1, 0, Vec4::ORIGIN).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_animation_routing() {
        let (optimizer, bridge, _) = optimizer(100, 10);
        optimizer.add_animation_action(3, 7, true).unwrap();
        optimizer.add_animation_action(3, 8, false).unwrap();
        optimizer.process_actions().unwrap();
        assert_eq!(
            bridge.calls(),
            vec![
                BridgeCall::AttackAnimation {
                    player: 3,
                    animation_type: 7
                },
                BridgeCall::DefenseAnimation {
                    player: 3,
                    animation_type: 8
                },
            ]
        );
    }

    #[test]
    fn test_movement_is_processed_but_not_forwarded() {
        let (optimizer, bridge, _) = optimizer(100, 10);
        optimizer
            .add_movement_action(5, Vec4::point(1.0, 0.0, 0.0), Vec4::ZERO)
            .unwrap();
        let report = optimizer.process_actions().unwrap();
        assert_eq!(report.forwarded, 1);
        assert_eq!(bridge.call_count(), 0);
        assert_eq!(optimizer.statistics().processed_actions, 1);
    }

    #[test]
    fn test_bridge_failure_is_fail_open() {
        let (optimizer, bridge, _) = optimizer(100, 10);
        bridge.set_failing(true);
        optimizer.add_attack_action(1, 1, 1, Vec4::ORIGIN).unwrap();
        optimizer.add_defense_action(1, 2, 3).unwrap();

        let report = optimizer.process_actions().unwrap();
        assert_eq!(report.forwarded, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(optimizer.total_queue_len(), 0);
        assert_eq!(optimizer.statistics().processed_actions, 2);
    }

    #[test]
    fn test_batch_size_limits_each_tier() {
        let (optimizer, _, _) = optimizer(100, 2);
        for _ in 0..5 {
            optimizer.add_defense_action(1, 0, 0).unwrap();
            optimizer.add_movement_action(1, Vec4::ORIGIN, Vec4::ZERO).unwrap();
        }
        let report = optimizer.process_actions().unwrap();
        assert_eq!(report.forwarded, 4);
        assert_eq!(optimizer.queue_len(Priority::Critical), 3);
        assert_eq!(optimizer.queue_len(Priority::Low), 3);
    }

    #[test]
    fn test_process_single_tier() {
        let (optimizer, bridge, _) = optimizer(100, 10);
        optimizer.add_attack_action(1, 1, 1, Vec4::ORIGIN).unwrap();
        optimizer.add_defense_action(1, 1, 1).unwrap();

        let report = optimizer.process_tier(Priority::High).unwrap();
        assert_eq!(report.forwarded, 1);
        assert_eq!(optimizer.queue_len(Priority::Critical), 1);
        assert!(matches!(bridge.calls()[0], BridgeCall::Attack { .. }));
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let (optimizer, _, _) = optimizer(100, 10);
        optimizer.add_defense_action(1, 0, 0).unwrap();
        optimizer.shutdown();

        assert_eq!(optimizer.total_queue_len(), 0);
        assert_eq!(optimizer.add_defense_action(1, 0, 0), Err(Rejected::NotAccepting));
        assert_eq!(optimizer.process_actions(), Err(CombatError::ShutDown));
        assert_eq!(
            optimizer.initialize(OptimizerConfig::default()),
            Err(CombatError::ShutDown)
        );
    }

    #[test]
    fn test_overload_reporting() {
        let (optimizer, _, _) = optimizer(20, 10);
        // Capacities 5/5/10/5: fill Medium and Critical = 15 entries (75%).
        for _ in 0..10 {
            optimizer.add_animation_action(1, 0, true).unwrap();
        }
        for _ in 0..5 {
            optimizer.add_defense_action(1, 0, 0).unwrap();
        }
        assert!(!optimizer.is_overloaded());
        assert!((optimizer.processing_load() - 0.75).abs() < 1e-6);

        for _ in 0..2 {
            optimizer.add_attack_action(1, 0, 0, Vec4::ORIGIN).unwrap();
        }
        assert!(optimizer.is_overloaded());
        let status = optimizer.status();
        assert_eq!(status.queue_lengths, [5, 2, 10, 0]);
        assert!(status.to_string().contains("OVERLOADED"));
    }

    #[test]
    fn test_set_max_queue_size() {
        let (optimizer, _, _) = optimizer(100, 10);
        optimizer.set_max_queue_size(8);
        assert_eq!(optimizer.config().max_queue_size, 8);
        optimizer.add_defense_action(1, 0, 0).unwrap();
        optimizer.add_defense_action(1, 0, 0).unwrap();
        assert!(matches!(
            optimizer.add_defense_action(1, 0, 0),
            Err(Rejected::TierFull { capacity: 2, .. })
        ));
    }
}
