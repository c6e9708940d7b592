//! # Combat System Facade
//!
//! Owns one dispatcher, one interpolation engine and the background thread
//! that drains the dispatcher at a fixed interval.
//!
//! ```text
//! Uninitialized ──initialize──► Initialized ──start──► Running ◄──resume── Paused
//!                                    ▲                   │  └───pause───────►│
//!                                    │                   ▼                   │
//!                                    └────start───── Stopped ◄────stop───────┘
//!                                                        │
//!                              (any state) ──shutdown──► Shutdown (terminal)
//! ```
//!
//! The processing thread checks its stop flag at the top of every tick and
//! waits between ticks on a channel, so `stop_processing` returns within one
//! pass rather than one interval.

use super::config::{CombatSystemConfig, ConfigError, RelayConfig};
use super::health::{HealthIssue, StatusReport, SystemInfo, HIGH_LOAD_THRESHOLD};
use super::tick::{TickPacer, TickStats};
use crate::interpolation::{EntityId, InterpolatedPosition, InterpolationConfig, PositionInterpolator};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use kestrel_combat::{
    decode_frame, ActionId, ActionPayload, BridgeError, CombatError, CombatOptimizer,
    PerformanceMonitor, PerformanceSample, PlayerId, ProcessReport, Rejected, ScriptBridge,
};
use kestrel_core::{SharedClock, SystemClock, Vec4};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Name of the background processing thread.
pub const PROCESSING_THREAD_NAME: &str = "kestrel-combat";

/// Facade lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacadeState {
    /// Created, nothing started.
    Uninitialized,
    /// Bridge and dispatcher ready; no processing thread.
    Initialized,
    /// Processing thread running passes.
    Running,
    /// Processing thread alive but skipping passes.
    Paused,
    /// Processing thread joined; may be restarted.
    Stopped,
    /// Torn down for good.
    Shutdown,
}

impl FacadeState {
    /// True while the dispatcher accepts work.
    #[must_use]
    pub const fn is_initialized(self) -> bool {
        matches!(
            self,
            Self::Initialized | Self::Running | Self::Paused | Self::Stopped
        )
    }
}

impl fmt::Display for FacadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Shutdown => "shutdown",
        })
    }
}

/// Facade lifecycle failures.
#[derive(Debug, Error)]
pub enum SystemError {
    /// The scripting runtime failed to load.
    #[error("bridge initialization failed: {0}")]
    Bridge(#[from] BridgeError),
    /// The dispatcher refused the operation.
    #[error(transparent)]
    Combat(#[from] CombatError),
    /// The facade configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The operation is not valid in the current state.
    #[error("operation not valid while {0}")]
    InvalidState(FacadeState),
    /// The processing thread could not be spawned.
    #[error("failed to spawn processing thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// State shared with the processing thread.
struct Core {
    optimizer: Arc<CombatOptimizer>,
    monitor: PerformanceMonitor,
    interval_us: AtomicU64,
    paused: AtomicBool,
    processed_passes: AtomicU64,
    tick_stats: Mutex<TickStats>,
}

impl Core {
    fn processing_interval(&self) -> Duration {
        Duration::from_micros(self.interval_us.load(Ordering::Relaxed))
    }

    fn run_pass(&self) -> Option<ProcessReport> {
        match self.optimizer.process_actions() {
            Ok(report) => {
                self.processed_passes.fetch_add(1, Ordering::Relaxed);
                self.monitor.record(PerformanceSample {
                    frame_time: report.elapsed,
                    actions: report.forwarded,
                    queue_size: self.optimizer.total_queue_len(),
                });
                Some(report)
            }
            Err(CombatError::AlreadyProcessing) => {
                trace!("pass skipped: another pass in progress");
                None
            }
            Err(error) => {
                debug!(%error, "pass skipped");
                None
            }
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    stop_tx: Sender<()>,
}

fn processing_loop(core: &Core, stop: &AtomicBool, stop_rx: &Receiver<()>) {
    let mut pacer = TickPacer::new(core.processing_interval());
    debug!("combat processing thread started");

    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }

        pacer.set_interval(core.processing_interval());
        let start = pacer.begin_tick();
        if !core.paused.load(Ordering::Acquire) {
            core.run_pass();
        }
        pacer.end_tick(start, core.optimizer.config().max_processing_time);
        *core.tick_stats.lock() = *pacer.stats();

        match stop_rx.recv_timeout(pacer.time_until_next_tick()) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(ticks = pacer.tick_count(), "combat processing thread stopped");
}

/// Integration facade: dispatcher + interpolation engine + processing thread.
pub struct CombatSystem {
    core: Arc<Core>,
    interpolator: Arc<PositionInterpolator>,
    bridge: Arc<dyn ScriptBridge>,
    config: RwLock<CombatSystemConfig>,
    state: Mutex<FacadeState>,
    worker: Mutex<Option<Worker>>,
    rejected_actions: AtomicU64,
}

impl CombatSystem {
    /// Creates an uninitialized facade.
    #[must_use]
    pub fn new(
        config: CombatSystemConfig,
        interpolation: InterpolationConfig,
        bridge: Arc<dyn ScriptBridge>,
        clock: SharedClock,
    ) -> Self {
        let optimizer = Arc::new(CombatOptimizer::new(Arc::clone(&bridge), Arc::clone(&clock)));
        let interpolator = Arc::new(PositionInterpolator::new(interpolation, clock));
        Self {
            core: Arc::new(Core {
                optimizer,
                monitor: PerformanceMonitor::new(config.monitor_capacity),
                interval_us: AtomicU64::new(duration_micros(config.processing_interval())),
                paused: AtomicBool::new(false),
                processed_passes: AtomicU64::new(0),
                tick_stats: Mutex::new(TickStats::new()),
            }),
            interpolator,
            bridge,
            config: RwLock::new(config),
            state: Mutex::new(FacadeState::Uninitialized),
            worker: Mutex::new(None),
            rejected_actions: AtomicU64::new(0),
        }
    }

    /// Creates a facade from a loaded relay configuration.
    #[must_use]
    pub fn from_config(config: &RelayConfig, bridge: Arc<dyn ScriptBridge>, clock: SharedClock) -> Self {
        Self::new(config.combat, config.interpolation, bridge, clock)
    }

    /// Creates a facade with default tuning on the system clock.
    #[must_use]
    pub fn with_bridge(bridge: Arc<dyn ScriptBridge>) -> Self {
        Self::new(
            CombatSystemConfig::default(),
            InterpolationConfig::default(),
            bridge,
            SystemClock::shared(),
        )
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initializes the bridge, then the dispatcher.
    ///
    /// Calling this on an initialized facade is a no-op.
    ///
    /// # Errors
    ///
    /// [`SystemError::InvalidState`] after shutdown; config, bridge or
    /// dispatcher failures otherwise.
    pub fn initialize(&self) -> Result<(), SystemError> {
        let mut state = self.state.lock();
        match *state {
            FacadeState::Uninitialized => {}
            FacadeState::Shutdown => return Err(SystemError::InvalidState(FacadeState::Shutdown)),
            _ => return Ok(()),
        }

        let config = *self.config.read();
        config.validate()?;
        self.bridge.initialize()?;
        if let Err(error) = self.core.optimizer.initialize(config.to_optimizer_config()) {
            self.bridge.shutdown();
            return Err(error.into());
        }
        if config.enable_performance_monitoring {
            self.core.monitor.start();
        }

        *state = FacadeState::Initialized;
        info!(
            interval_ms = config.processing_interval_ms,
            max_queue_size = config.max_queue_size,
            batch_size = config.batch_size,
            "combat system initialized"
        );
        Ok(())
    }

    /// Spawns the processing thread.
    ///
    /// A no-op while already running or paused.
    ///
    /// # Errors
    ///
    /// [`SystemError::InvalidState`] before initialization or after
    /// shutdown; [`SystemError::Spawn`] if the OS refuses the thread.
    pub fn start_processing(&self) -> Result<(), SystemError> {
        let mut state = self.state.lock();
        match *state {
            FacadeState::Initialized | FacadeState::Stopped => {}
            FacadeState::Running | FacadeState::Paused => return Ok(()),
            other => return Err(SystemError::InvalidState(other)),
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        self.core.paused.store(false, Ordering::Release);

        let core = Arc::clone(&self.core);
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(PROCESSING_THREAD_NAME.to_owned())
            .spawn(move || processing_loop(&core, &flag, &stop_rx))?;

        *self.worker.lock() = Some(Worker {
            handle,
            stop,
            stop_tx,
        });
        *state = FacadeState::Running;
        info!(
            interval_us = self.core.interval_us.load(Ordering::Relaxed),
            "combat processing started"
        );
        Ok(())
    }

    /// Signals and joins the worker, if any. Callers hold the state lock so
    /// no new worker can be spawned in between.
    fn join_worker(&self) -> bool {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return false;
        };

        worker.stop.store(true, Ordering::Release);
        // A full channel already holds a wake-up.
        let _ = worker.stop_tx.try_send(());
        if worker.handle.join().is_err() {
            warn!("combat processing thread panicked");
        }
        self.core.paused.store(false, Ordering::Release);
        true
    }

    /// Stops and joins the processing thread. Returns whether one was running.
    pub fn stop_processing(&self) -> bool {
        let mut state = self.state.lock();
        if !self.join_worker() {
            return false;
        }
        if matches!(*state, FacadeState::Running | FacadeState::Paused) {
            *state = FacadeState::Stopped;
        }
        info!("combat processing stopped");
        true
    }

    /// Keeps the thread alive but skips passes. Returns whether it paused.
    pub fn pause_processing(&self) -> bool {
        let mut state = self.state.lock();
        if *state != FacadeState::Running {
            return false;
        }
        self.core.paused.store(true, Ordering::Release);
        *state = FacadeState::Paused;
        info!("combat processing paused");
        true
    }

    /// Resumes passes after [`CombatSystem::pause_processing`].
    pub fn resume_processing(&self) -> bool {
        let mut state = self.state.lock();
        if *state != FacadeState::Paused {
            return false;
        }
        self.core.paused.store(false, Ordering::Release);
        *state = FacadeState::Running;
        info!("combat processing resumed");
        true
    }

    /// Stops processing, then shuts down the dispatcher and the bridge.
    /// Terminal; repeated calls are no-ops.
    ///
    /// The state lock is held throughout, so a concurrent
    /// [`CombatSystem::start_processing`] either runs first and is joined
    /// here, or observes `Shutdown` and fails.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if *state == FacadeState::Shutdown {
            return;
        }
        if self.join_worker() {
            info!("combat processing stopped");
        }

        let was_initialized = state.is_initialized();
        self.core.optimizer.shutdown();
        if was_initialized {
            self.bridge.shutdown();
        }
        self.core.monitor.stop();
        *state = FacadeState::Shutdown;
        info!("combat system shut down");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> FacadeState {
        *self.state.lock()
    }

    /// True between initialization and shutdown.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized()
    }

    /// True while the processing thread exists.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(self.state(), FacadeState::Running | FacadeState::Paused)
    }

    // ------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------

    /// Runs one dispatcher pass unless processing is paused.
    pub fn process_combat_actions(&self) -> Option<ProcessReport> {
        if self.core.paused.load(Ordering::Acquire) {
            return None;
        }
        self.core.run_pass()
    }

    /// Runs one dispatcher pass from the caller's thread, even while paused.
    pub fn force_process_actions(&self) -> Option<ProcessReport> {
        self.core.run_pass()
    }

    // ------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------

    fn admit(&self, player: PlayerId, result: Result<ActionId, Rejected>) -> bool {
        match result {
            Ok(id) => {
                trace!(player, %id, "combat action queued");
                true
            }
            Err(rejected) => {
                self.rejected_actions.fetch_add(1, Ordering::Relaxed);
                warn!(player, %rejected, "combat action rejected");
                false
            }
        }
    }

    /// Queues an attack.
    pub fn execute_attack(
        &self,
        player: PlayerId,
        attack_type: u32,
        weapon_type: u32,
        target_position: Vec4,
    ) -> bool {
        self.admit(
            player,
            self.core
                .optimizer
                .add_attack_action(player, attack_type, weapon_type, target_position),
        )
    }

    /// Queues a defense.
    pub fn execute_defense(&self, player: PlayerId, defense_type: u32, incoming_attack_id: u32) -> bool {
        self.admit(
            player,
            self.core
                .optimizer
                .add_defense_action(player, defense_type, incoming_attack_id),
        )
    }

    /// Queues a sign cast.
    pub fn cast_sign(&self, player: PlayerId, sign_type: u32, target_position: Vec4) -> bool {
        self.admit(
            player,
            self.core.optimizer.add_sign_action(player, sign_type, target_position),
        )
    }

    /// Queues an animation.
    pub fn play_animation(&self, player: PlayerId, animation_type: u32, is_attack: bool) -> bool {
        self.admit(
            player,
            self.core
                .optimizer
                .add_animation_action(player, animation_type, is_attack),
        )
    }

    /// Queues a movement report.
    pub fn update_player_position(&self, player: PlayerId, position: Vec4, velocity: Vec4) -> bool {
        self.admit(
            player,
            self.core.optimizer.add_movement_action(player, position, velocity),
        )
    }

    /// Queues any action payload.
    pub fn submit_action(&self, player: PlayerId, payload: ActionPayload) -> bool {
        self.admit(player, self.core.optimizer.add_action(player, payload))
    }

    /// Queues `actions` in order, stopping at the first rejection.
    ///
    /// Returns `true` only if every action was queued. Actions queued before
    /// a rejection stay queued.
    pub fn execute_combat_sequence(&self, player: PlayerId, actions: &[ActionPayload]) -> bool {
        actions.iter().all(|payload| self.submit_action(player, *payload))
    }

    /// Decodes one binary input frame and queues it.
    pub fn process_player_input(&self, player: PlayerId, input: &[u8]) -> bool {
        match decode_frame(input) {
            Ok(payload) => self.submit_action(player, payload),
            Err(error) => {
                self.rejected_actions.fetch_add(1, Ordering::Relaxed);
                warn!(player, %error, len = input.len(), "malformed player input");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    /// Records a position snapshot timestamped now.
    pub fn add_position_snapshot(
        &self,
        entity: EntityId,
        position: Vec4,
        velocity: Vec4,
        rotation: f32,
        sequence: u32,
    ) -> bool {
        self.interpolator
            .add_position_snapshot(entity, position, velocity, rotation, sequence)
    }

    /// Poses of every tracked entity with confidence above zero.
    pub fn interpolate_all_positions(&self, time_offset: f32) -> Vec<InterpolatedPosition> {
        self.interpolator.interpolate_all(time_offset)
    }

    /// Drops every trace of a disconnected entity.
    pub fn remove_entity(&self, entity: EntityId) -> bool {
        self.interpolator.cleanup_entity(entity)
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// The dispatcher.
    #[must_use]
    pub fn optimizer(&self) -> &Arc<CombatOptimizer> {
        &self.core.optimizer
    }

    /// The interpolation engine.
    #[must_use]
    pub fn interpolator(&self) -> &Arc<PositionInterpolator> {
        &self.interpolator
    }

    /// The pass-timing monitor.
    #[must_use]
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.core.monitor
    }

    // ------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------

    /// Queue occupancy, `[0, 1]`.
    #[must_use]
    pub fn processing_load(&self) -> f32 {
        self.core.optimizer.processing_load()
    }

    /// Completed passes (background and forced).
    #[must_use]
    pub fn processed_passes(&self) -> u64 {
        self.core.processed_passes.load(Ordering::Relaxed)
    }

    /// Actions dropped by the dispatcher (shed, full, evicted).
    #[must_use]
    pub fn dropped_actions(&self) -> u64 {
        self.core.optimizer.dropped_actions()
    }

    /// Admission calls that returned `false`, including malformed input.
    #[must_use]
    pub fn rejected_actions(&self) -> u64 {
        self.rejected_actions.load(Ordering::Relaxed)
    }

    /// Rolling average pass time.
    #[must_use]
    pub fn average_processing_time(&self) -> Duration {
        self.core.optimizer.average_processing_time()
    }

    /// True when queues are above 80% of capacity.
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.core.optimizer.is_overloaded()
    }

    /// Timing of the processing thread's ticks.
    #[must_use]
    pub fn tick_stats(&self) -> TickStats {
        *self.core.tick_stats.lock()
    }

    /// Current issues; empty when healthy.
    #[must_use]
    pub fn health_issues(&self) -> Vec<HealthIssue> {
        let mut issues = Vec::new();
        if !self.is_initialized() {
            issues.push(HealthIssue::NotInitialized);
        }
        if self.is_overloaded() {
            issues.push(HealthIssue::Overloaded);
        }
        let load = self.processing_load();
        if load > HIGH_LOAD_THRESHOLD {
            issues.push(HealthIssue::HighLoad(load));
        }
        issues
    }

    /// Initialized and not overloaded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.health_issues().is_empty()
    }

    /// Point-in-time counters and health.
    #[must_use]
    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            state: self.state(),
            load: self.processing_load(),
            processed_passes: self.processed_passes(),
            dropped_actions: self.dropped_actions(),
            rejected_actions: self.rejected_actions(),
            average_processing_time: self.average_processing_time(),
            queued_actions: self.core.optimizer.total_queue_len(),
            tracked_entities: self.interpolator.entity_count(),
            issues: self.health_issues(),
        }
    }

    /// Version and tuning.
    #[must_use]
    pub fn system_info(&self) -> SystemInfo {
        let config = *self.config.read();
        SystemInfo {
            version: env!("CARGO_PKG_VERSION"),
            processing_interval: self.core.processing_interval(),
            max_processing_time: self.core.optimizer.config().max_processing_time,
            max_queue_size: self.core.optimizer.config().max_queue_size,
            batch_size: config.batch_size,
            monitoring: self.core.monitor.is_monitoring(),
        }
    }

    /// Zeroes every counter of the facade and its components.
    pub fn reset_statistics(&self) {
        self.core.optimizer.reset_statistics();
        self.core.processed_passes.store(0, Ordering::Relaxed);
        self.rejected_actions.store(0, Ordering::Relaxed);
        self.core.monitor.reset();
        *self.core.tick_stats.lock() = TickStats::new();
        self.interpolator.reset_stats();
    }

    /// Logs the facade, dispatcher and engine counters at info level.
    pub fn log_statistics(&self) {
        let summary = self.core.monitor.summary();
        let ticks = self.tick_stats();
        info!(
            state = %self.state(),
            passes = self.processed_passes(),
            rejected = self.rejected_actions(),
            samples = summary.samples,
            avg_frame_us = u64::try_from(summary.average_frame_time.as_micros()).unwrap_or(u64::MAX),
            late_ticks = ticks.late_ticks,
            "combat system statistics"
        );
        self.core.optimizer.log_statistics();
        self.interpolator.log_stats();
    }

    // ------------------------------------------------------------------
    // Tuning
    // ------------------------------------------------------------------

    /// Changes the tick interval; takes effect on the next tick. Zero is
    /// ignored.
    pub fn set_processing_interval(&self, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        self.core
            .interval_us
            .store(duration_micros(interval), Ordering::Relaxed);
        self.config.write().processing_interval_ms =
            u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    }

    /// Changes the per-pass processing budget.
    pub fn set_max_processing_time(&self, budget: Duration) {
        self.core.optimizer.set_max_processing_time(budget);
        self.config.write().max_processing_time_ms =
            u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
    }

    /// Changes the combined tier capacity. Zero is ignored.
    pub fn set_max_queue_size(&self, max_queue_size: usize) {
        if max_queue_size == 0 {
            return;
        }
        self.core.optimizer.set_max_queue_size(max_queue_size);
        self.config.write().max_queue_size = max_queue_size;
    }

    /// Current facade configuration.
    #[must_use]
    pub fn config(&self) -> CombatSystemConfig {
        *self.config.read()
    }
}

impl Drop for CombatSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for CombatSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatSystem")
            .field("state", &self.state())
            .field("config", &self.config())
            .field("optimizer", &self.core.optimizer)
            .finish_non_exhaustive()
    }
}

fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX).max(1)
}
