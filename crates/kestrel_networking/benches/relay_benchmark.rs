//! # Relay Performance Benchmark
//!
//! Targets:
//! - Admission: < 1us per action
//! - Full pass over 1000 queued actions: < 1ms
//! - Interpolation query: < 5us per entity
//!
//! Run with: `cargo bench --package kestrel_networking`

// Benchmarks don't need strict docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel_combat::{decode_frame, ActionPayload, CombatOptimizer, OptimizerConfig, PayloadWriter, RecordingBridge};
use kestrel_core::{ManualClock, Vec4};
use kestrel_networking::{InterpolationConfig, InterpolationKind, PositionInterpolator, PositionSnapshot};
use std::sync::Arc;

fn optimizer(max_queue_size: usize) -> CombatOptimizer {
    let optimizer = CombatOptimizer::new(Arc::new(RecordingBridge::new()), ManualClock::new().shared());
    optimizer
        .initialize(OptimizerConfig {
            max_queue_size,
            batch_size: max_queue_size,
            ..OptimizerConfig::default()
        })
        .expect("valid config");
    optimizer
}

/// Benchmark: admission of one defense into a mostly empty dispatcher.
fn bench_admission(c: &mut Criterion) {
    let optimizer = optimizer(1_000_000);

    c.bench_function("admit_defense", |b| {
        b.iter(|| black_box(optimizer.add_defense_action(black_box(7), 1, 41)));
    });
}

/// Benchmark: one full pass over a pre-filled dispatcher.
fn bench_process_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_pass");

    for queued in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(queued), &queued, |b, &queued| {
            let optimizer = optimizer(queued * 4);
            b.iter(|| {
                for player in 0..u32::try_from(queued / 2).unwrap_or(u32::MAX) {
                    let _ = optimizer.add_defense_action(player, 1, 1);
                    let _ = optimizer.add_attack_action(player, 1, 1, Vec4::ORIGIN);
                }
                black_box(optimizer.process_actions().expect("initialized"))
            });
        });
    }

    group.finish();
}

/// Benchmark: decoding one binary input frame.
fn bench_decode(c: &mut Criterion) {
    let mut writer = PayloadWriter::new();
    assert!(writer.encode(&ActionPayload::Attack {
        attack_type: 2,
        weapon_type: 1,
        target_position: Vec4::point(3.0, 0.0, -4.0),
    }));
    let frame = writer.as_slice().to_vec();

    c.bench_function("decode_attack_frame", |b| {
        b.iter(|| black_box(decode_frame(black_box(&frame))));
    });
}

/// Benchmark: one interpolation query per curve family.
fn bench_interpolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolate");

    for kind in [
        InterpolationKind::Linear,
        InterpolationKind::Cubic,
        InterpolationKind::Hermite,
        InterpolationKind::CatmullRom,
        InterpolationKind::Bezier,
    ] {
        let clock = ManualClock::new();
        let engine = PositionInterpolator::new(
            InterpolationConfig {
                kind,
                duration: 10.0,
                ..InterpolationConfig::default()
            },
            clock.shared(),
        );
        for i in 0..20u8 {
            let t = f32::from(i) * 0.05;
            engine.add_snapshot(PositionSnapshot::new(
                1,
                Vec4::point(t * 5.0, 0.0, t),
                Vec4::direction(5.0, 0.0, 1.0),
                t,
                clock.at_secs(t),
                u32::from(i),
            ));
        }
        clock.advance_secs(1.0);

        group.bench_with_input(BenchmarkId::from_parameter(kind), &engine, |b, engine| {
            b.iter(|| black_box(engine.interpolate(1, black_box(0.1))));
        });
    }

    group.finish();
}

/// Benchmark: interpolate_all over many entities.
fn bench_interpolate_all(c: &mut Criterion) {
    let clock = ManualClock::new();
    let engine = PositionInterpolator::new(
        InterpolationConfig {
            duration: 10.0,
            ..InterpolationConfig::default()
        },
        clock.shared(),
    );
    for entity in 0..500u32 {
        for i in 0..8u8 {
            let t = f32::from(i) * 0.05;
            engine.add_snapshot(PositionSnapshot::new(
                entity,
                Vec4::point(t, 0.0, 0.0),
                Vec4::direction(1.0, 0.0, 0.0),
                0.0,
                clock.at_secs(t),
                u32::from(i),
            ));
        }
    }
    clock.advance_secs(0.4);

    c.bench_function("interpolate_all_500", |b| {
        b.iter(|| black_box(engine.interpolate_all(black_box(0.1))));
    });
}

criterion_group!(
    benches,
    bench_admission,
    bench_process_pass,
    bench_decode,
    bench_interpolate,
    bench_interpolate_all,
);
criterion_main!(benches);
