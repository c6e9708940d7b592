//! Integration tests for the combat system facade.

use kestrel_combat::{ActionPayload, BridgeCall, PayloadWriter, RecordingBridge};
use kestrel_core::{ManualClock, SystemClock, Vec4};
use kestrel_networking::{
    CombatSystem, CombatSystemConfig, FacadeState, HealthIssue, InterpolationConfig, RelayConfig,
    SystemError,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn running_system(config: CombatSystemConfig) -> (CombatSystem, Arc<RecordingBridge>) {
    let bridge = Arc::new(RecordingBridge::new());
    let system = CombatSystem::new(
        config,
        InterpolationConfig::default(),
        bridge.clone(),
        SystemClock::shared(),
    );
    system.initialize().unwrap();
    (system, bridge)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_background_thread_drains_queues() {
    let (system, bridge) = running_system(CombatSystemConfig::low_latency());
    system.start_processing().unwrap();

    for player in 0..20 {
        assert!(system.execute_attack(player, 1, 1, Vec4::point(1.0, 0.0, 1.0)));
        assert!(system.execute_defense(player, 1, 2));
    }

    assert!(wait_until(Duration::from_secs(2), || bridge.call_count() == 40));
    assert!(system.processed_passes() > 0);
    assert_eq!(system.optimizer().total_queue_len(), 0);
    assert!(system.tick_stats().total_ticks > 0);

    system.shutdown();
    assert_eq!(system.state(), FacadeState::Shutdown);
}

#[test]
fn test_stop_is_prompt_with_long_interval() {
    let (system, _) = running_system(CombatSystemConfig {
        processing_interval_ms: 10_000,
        ..CombatSystemConfig::default()
    });
    system.start_processing().unwrap();
    thread::sleep(Duration::from_millis(20));

    let started = Instant::now();
    assert!(system.stop_processing());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(system.state(), FacadeState::Stopped);

    // Restartable after a stop.
    system.start_processing().unwrap();
    assert_eq!(system.state(), FacadeState::Running);
}

#[test]
fn test_shutdown_racing_start_leaves_no_worker() {
    for _ in 0..50 {
        let (system, bridge) = running_system(CombatSystemConfig::low_latency());
        thread::scope(|scope| {
            scope.spawn(|| {
                let _ = system.start_processing();
            });
            scope.spawn(|| system.shutdown());
        });

        assert_eq!(system.state(), FacadeState::Shutdown);
        assert!(!system.is_processing());
        assert!(!bridge.is_initialized());
        assert!(matches!(
            system.start_processing(),
            Err(SystemError::InvalidState(FacadeState::Shutdown))
        ));

        let ticks = system.tick_stats().total_ticks;
        thread::sleep(Duration::from_millis(12));
        assert_eq!(system.tick_stats().total_ticks, ticks);
    }
}

#[test]
fn test_paused_thread_forwards_nothing() {
    let (system, bridge) = running_system(CombatSystemConfig::low_latency());
    system.start_processing().unwrap();
    assert!(system.pause_processing());
    thread::sleep(Duration::from_millis(20));

    assert!(system.execute_defense(1, 0, 0));
    thread::sleep(Duration::from_millis(40));
    assert_eq!(bridge.call_count(), 0);

    assert!(system.resume_processing());
    assert!(wait_until(Duration::from_secs(2), || bridge.call_count() == 1));
}

#[test]
fn test_player_input_frames() {
    let (system, bridge) = running_system(CombatSystemConfig::default());

    let mut writer = PayloadWriter::new();
    assert!(writer.encode(&ActionPayload::Sign {
        sign_type: 3,
        target_position: Vec4::point(2.0, 0.0, 4.0),
    }));
    assert!(system.process_player_input(11, writer.as_slice()));

    // Truncated frame.
    assert!(!system.process_player_input(11, &writer.as_slice()[..6]));
    assert_eq!(system.rejected_actions(), 1);

    system.force_process_actions();
    assert_eq!(
        bridge.calls(),
        vec![BridgeCall::Sign {
            player: 11,
            sign_type: 3,
            target: Vec4::point(2.0, 0.0, 4.0),
        }]
    );
}

#[test]
fn test_combat_sequence_stops_at_first_rejection() {
    let (system, _) = running_system(CombatSystemConfig {
        max_queue_size: 8,
        ..CombatSystemConfig::default()
    });

    // High tier holds max/4 = 2.
    let attack = ActionPayload::Attack {
        attack_type: 1,
        weapon_type: 1,
        target_position: Vec4::ORIGIN,
    };
    assert!(system.execute_combat_sequence(5, &[attack, attack]));
    assert!(!system.execute_combat_sequence(5, &[attack, attack]));
    assert_eq!(system.rejected_actions(), 1);
    assert_eq!(system.dropped_actions(), 1);
    assert_eq!(system.optimizer().total_queue_len(), 2);
}

#[test]
fn test_health_reports_overload() {
    let (system, _) = running_system(CombatSystemConfig {
        max_queue_size: 100,
        ..CombatSystemConfig::default()
    });
    assert!(system.is_healthy());

    // Critical 25 + High 25 + Medium 40 = 90%: overloaded but not high.
    for player in 0..25 {
        system.execute_defense(player, 0, 0);
        system.execute_attack(player, 0, 0, Vec4::ORIGIN);
    }
    for player in 0..40 {
        system.play_animation(player, 0, true);
    }

    let issues = system.health_issues();
    assert_eq!(issues, vec![HealthIssue::Overloaded]);
    assert!(!system.is_healthy());

    let report = system.status_report();
    assert_eq!(report.queued_actions, 90);
    assert!(report.to_string().contains("System overloaded"));
}

#[test]
fn test_positions_flow_through_facade() {
    let bridge = Arc::new(RecordingBridge::new());
    let clock = ManualClock::new();
    let system = CombatSystem::new(
        CombatSystemConfig::default(),
        InterpolationConfig {
            duration: 1.0,
            smoothing: 0.0,
            enable_jitter_reduction: false,
            enable_lag_compensation: false,
            ..InterpolationConfig::default()
        },
        bridge,
        clock.shared(),
    );
    system.initialize().unwrap();

    for entity in [4u32, 9] {
        system.add_position_snapshot(entity, Vec4::ORIGIN, Vec4::ZERO, 0.0, 1);
    }
    clock.advance_secs(0.5);
    for entity in [4u32, 9] {
        system.add_position_snapshot(entity, Vec4::point(5.0, 0.0, 0.0), Vec4::ZERO, 0.0, 2);
    }

    let poses = system.interpolate_all_positions(0.25);
    assert_eq!(poses.len(), 2);
    assert!(poses.iter().all(|p| (p.position.x - 2.5).abs() < 1e-3));

    assert!(system.remove_entity(4));
    assert_eq!(system.interpolate_all_positions(0.25).len(), 1);
}

#[test]
fn test_reset_statistics() {
    let (system, _) = running_system(CombatSystemConfig::default());
    system.execute_defense(1, 0, 0);
    system.force_process_actions();
    assert!(!system.process_player_input(1, &[]));
    assert_eq!(system.processed_passes(), 1);

    system.reset_statistics();
    assert_eq!(system.processed_passes(), 0);
    assert_eq!(system.rejected_actions(), 0);
    assert_eq!(system.optimizer().statistics().total_actions, 0);
    assert!(system.monitor().samples().is_empty());
}

#[test]
fn test_relay_config_builds_system() {
    let config = RelayConfig::from_toml_str(
        r#"
        [combat]
        processing_interval_ms = 8
        batch_size = 10
        "#,
    )
    .unwrap();
    let system = CombatSystem::from_config(
        &config,
        Arc::new(RecordingBridge::new()),
        SystemClock::shared(),
    );
    system.initialize().unwrap();

    let info = system.system_info();
    assert_eq!(info.processing_interval, Duration::from_millis(8));
    assert_eq!(info.batch_size, 10);
    assert!(info.monitoring);
    assert_eq!(system.optimizer().config().batch_size, 10);
}

#[test]
fn test_drop_shuts_down_bridge() {
    let bridge = Arc::new(RecordingBridge::new());
    {
        let system = CombatSystem::with_bridge(bridge.clone());
        system.initialize().unwrap();
        system.start_processing().unwrap();
        assert!(bridge.is_initialized());
    }
    assert!(!bridge.is_initialized());
}
