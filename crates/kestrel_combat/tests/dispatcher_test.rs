//! Integration tests for the combat action dispatcher.

use kestrel_combat::{
    ActionKind, ActionPayload, BridgeCall, CombatActionBuilder, CombatOptimizer, OptimizerConfig,
    Priority, PriorityPolicy, RecordingBridge, Rejected,
};
use kestrel_core::{ManualClock, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn setup(config: OptimizerConfig) -> (Arc<CombatOptimizer>, Arc<RecordingBridge>, ManualClock) {
    let bridge = Arc::new(RecordingBridge::new());
    let clock = ManualClock::new();
    let optimizer = Arc::new(CombatOptimizer::new(bridge.clone(), clock.shared()));
    optimizer.initialize(config).unwrap();
    (optimizer, bridge, clock)
}

fn default_setup() -> (Arc<CombatOptimizer>, Arc<RecordingBridge>, ManualClock) {
    setup(OptimizerConfig::default())
}

#[test]
fn test_admission_monotonicity() {
    let (optimizer, _, _) = default_setup();

    // 200 of each forwardable kind stays below every tier capacity and the
    // 80% shedding threshold.
    for i in 0..200u32 {
        let before = optimizer.total_queue_len();
        assert!(optimizer.add_defense_action(i, 1, 1).is_ok());
        assert_eq!(optimizer.total_queue_len(), before + 1);

        let before = optimizer.total_queue_len();
        assert!(optimizer.add_animation_action(i, 1, true).is_ok());
        assert_eq!(optimizer.total_queue_len(), before + 1);

        let before = optimizer.total_queue_len();
        assert!(optimizer
            .add_movement_action(i, Vec4::point(1.0, 2.0, 3.0), Vec4::ZERO)
            .is_ok());
        assert_eq!(optimizer.total_queue_len(), before + 1);
    }

    let stats = optimizer.statistics();
    assert_eq!(stats.total_actions, 600);
    assert_eq!(stats.dropped_actions, 0);
}

#[test]
fn test_load_shedding_spares_critical() {
    let (optimizer, _, _) = default_setup();

    for i in 0..200 {
        optimizer.add_defense_action(i, 0, 0).unwrap();
    }
    for i in 0..250 {
        optimizer.add_attack_action(i, 0, 0, Vec4::ORIGIN).unwrap();
    }
    for i in 0..351 {
        optimizer.add_animation_action(i, 0, false).unwrap();
    }
    assert_eq!(optimizer.total_queue_len(), 801);
    assert!(optimizer.is_overloaded());

    let low = optimizer.add_movement_action(1, Vec4::ORIGIN, Vec4::ZERO);
    assert!(matches!(
        low,
        Err(Rejected::LoadShed {
            tier: Priority::Low,
            ..
        })
    ));
    assert_eq!(optimizer.statistics().dropped_actions, 1);

    // Critical still has room in its own tier.
    assert!(optimizer.add_defense_action(1, 0, 0).is_ok());
    assert_eq!(optimizer.statistics().dropped_actions, 1);
}

#[test]
fn test_priority_ordering() {
    let (optimizer, bridge, _) = default_setup();

    // Reverse-priority admission; the Low slot uses a forwardable kind.
    CombatActionBuilder::new(&optimizer)
        .player(4)
        .payload(ActionPayload::Sign {
            sign_type: 4,
            target_position: Vec4::ORIGIN,
        })
        .priority(Priority::Low)
        .submit()
        .unwrap();
    optimizer.add_animation_action(3, 3, true).unwrap();
    optimizer.add_attack_action(2, 2, 2, Vec4::ORIGIN).unwrap();
    optimizer.add_defense_action(1, 1, 1).unwrap();

    let report = optimizer.process_actions().unwrap();
    assert_eq!(report.forwarded, 4);

    let players: Vec<u32> = bridge
        .calls()
        .iter()
        .map(|call| match *call {
            BridgeCall::Attack { player, .. }
            | BridgeCall::Defense { player, .. }
            | BridgeCall::Sign { player, .. }
            | BridgeCall::AttackAnimation { player, .. }
            | BridgeCall::DefenseAnimation { player, .. } => player,
        })
        .collect();
    assert_eq!(players, vec![1, 2, 3, 4]);
}

#[test]
fn test_policy_override_changes_tier() {
    let (optimizer, bridge, _) = default_setup();
    optimizer.set_policy(PriorityPolicy::new().with_priority(ActionKind::Defense, Priority::Low));

    optimizer.add_defense_action(1, 0, 0).unwrap();
    optimizer.add_attack_action(2, 0, 0, Vec4::ORIGIN).unwrap();
    assert_eq!(optimizer.queue_len(Priority::Low), 1);

    optimizer.process_actions().unwrap();
    assert!(matches!(bridge.calls()[0], BridgeCall::Attack { player: 2, .. }));
}

#[test]
fn test_stale_actions_are_evicted_not_forwarded() {
    let (optimizer, bridge, clock) = setup(OptimizerConfig {
        batch_size: 1,
        ..OptimizerConfig::default()
    });

    optimizer.add_attack_action(1, 0, 0, Vec4::ORIGIN).unwrap();
    optimizer.add_attack_action(2, 0, 0, Vec4::ORIGIN).unwrap();
    clock.advance(Duration::from_secs(6));

    let report = optimizer.process_actions().unwrap();
    assert_eq!(report.forwarded, 1);
    assert_eq!(report.evicted, 1);
    assert_eq!(optimizer.total_queue_len(), 0);
    assert_eq!(optimizer.statistics().dropped_actions, 1);

    optimizer.process_actions().unwrap();
    assert_eq!(bridge.call_count(), 1);
    assert!(matches!(bridge.calls()[0], BridgeCall::Attack { player: 1, .. }));
}

#[test]
fn test_fresh_actions_survive_eviction() {
    let (optimizer, _, clock) = setup(OptimizerConfig {
        batch_size: 1,
        ..OptimizerConfig::default()
    });

    optimizer.add_attack_action(1, 0, 0, Vec4::ORIGIN).unwrap();
    optimizer.add_attack_action(2, 0, 0, Vec4::ORIGIN).unwrap();
    clock.advance(Duration::from_secs(5));

    let report = optimizer.process_actions().unwrap();
    assert_eq!(report.evicted, 0);
    assert_eq!(optimizer.total_queue_len(), 1);
}

#[test]
fn test_scenario_movement_flood() {
    let (optimizer, _, _) = default_setup();

    let accepted = (0..1200)
        .filter(|_| {
            optimizer
                .add_movement_action(9, Vec4::point(0.0, 0.0, 0.0), Vec4::ZERO)
                .is_ok()
        })
        .count();

    assert_eq!(accepted, 250);
    assert_eq!(optimizer.queue_len(Priority::Low), 250);
    let stats = optimizer.statistics();
    assert_eq!(stats.total_actions, 250);
    assert_eq!(stats.dropped_actions, 950);
}

#[test]
fn test_concurrent_producers_and_processor() {
    let (optimizer, _, _) = setup(OptimizerConfig {
        max_queue_size: 400,
        batch_size: 25,
        ..OptimizerConfig::default()
    });
    let producers_done = Arc::new(AtomicBool::new(false));
    let rejected = Arc::new(AtomicU64::new(0));
    let per_thread = 500;
    let threads = 4;

    let processor = {
        let optimizer = Arc::clone(&optimizer);
        let done = Arc::clone(&producers_done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                optimizer.process_actions().unwrap();
                thread::yield_now();
            }
        })
    };

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let optimizer = Arc::clone(&optimizer);
            let rejected = Arc::clone(&rejected);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(t);
                for _ in 0..per_thread {
                    let player = rng.gen_range(0..64u32);
                    let result = match rng.gen_range(0..5u32) {
                        0 => optimizer.add_attack_action(player, 1, 1, Vec4::ORIGIN),
                        1 => optimizer.add_defense_action(player, 1, 1),
                        2 => optimizer.add_sign_action(player, 1, Vec4::ORIGIN),
                        3 => optimizer.add_animation_action(player, 1, rng.gen()),
                        _ => optimizer.add_movement_action(player, Vec4::ORIGIN, Vec4::ZERO),
                    };
                    if result.is_err() {
                        rejected.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    producers_done.store(true, Ordering::Release);
    processor.join().unwrap();

    while optimizer.total_queue_len() > 0 {
        optimizer.process_actions().unwrap();
    }

    let stats = optimizer.statistics();
    let submitted = per_thread * threads;
    assert_eq!(stats.total_actions + rejected.load(Ordering::Relaxed), submitted);
    assert_eq!(stats.dropped_actions, rejected.load(Ordering::Relaxed));
    assert_eq!(stats.processed_actions, stats.total_actions);
}
