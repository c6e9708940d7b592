//! # KESTREL Relay
//!
//! Demo relay: runs a [`CombatSystem`] against a recording bridge and feeds
//! it synthetic combat traffic and position snapshots.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug kestrel_relay --config relay.toml --duration 10 --players 64
//! ```

use kestrel_combat::{ActionPayload, RecordingBridge};
use kestrel_core::{SystemClock, Vec4};
use kestrel_networking::{CombatSystem, RelayConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Snapshot / input rate of every synthetic player.
const CLIENT_RATE_HZ: u32 = 20;

struct Options {
    config_path: Option<String>,
    duration_secs: u64,
    players: u32,
    seed: u64,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn print_usage() {
    println!("Usage: kestrel_relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>      Relay configuration (TOML)");
    println!("  -d, --duration <SECS>    Run for N seconds then exit (default: 5)");
    println!("  -p, --players <NUM>      Synthetic players (default: 32)");
    println!("  -s, --seed <SEED>        Traffic seed (default: 7)");
    println!("  -h, --help               Show this help");
}

fn parse_args() -> Option<Options> {
    let mut options = Options {
        config_path: None,
        duration_secs: 5,
        players: 32,
        seed: 7,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => options.config_path = args.next(),
            "--duration" | "-d" => {
                options.duration_secs = args.next().and_then(|v| v.parse().ok()).unwrap_or(5);
            }
            "--players" | "-p" => {
                options.players = args.next().and_then(|v| v.parse().ok()).unwrap_or(32);
            }
            "--seed" | "-s" => {
                options.seed = args.next().and_then(|v| v.parse().ok()).unwrap_or(7);
            }
            "--help" | "-h" => {
                print_usage();
                return None;
            }
            other => eprintln!("ignoring unknown argument: {other}"),
        }
    }
    Some(options)
}

fn random_action(rng: &mut StdRng) -> ActionPayload {
    let target = Vec4::point(
        rng.gen_range(-50.0..50.0),
        0.0,
        rng.gen_range(-50.0..50.0),
    );
    match rng.gen_range(0..10u32) {
        0..=2 => ActionPayload::Attack {
            attack_type: rng.gen_range(0..4),
            weapon_type: rng.gen_range(0..3),
            target_position: target,
        },
        3..=4 => ActionPayload::Defense {
            defense_type: rng.gen_range(0..3),
            incoming_attack_id: rng.gen(),
        },
        5 => ActionPayload::Sign {
            sign_type: rng.gen_range(0..5),
            target_position: target,
        },
        _ => ActionPayload::Animation {
            animation_type: rng.gen_range(0..8),
            is_attack: rng.gen(),
        },
    }
}

fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &options.config_path {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::default(),
    };

    let bridge = Arc::new(RecordingBridge::new());
    let system = CombatSystem::from_config(&config, bridge.clone(), SystemClock::shared());
    println!("{}", system.system_info());
    println!();

    system.initialize()?;
    system.start_processing()?;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut positions: Vec<(Vec4, Vec4)> = (0..options.players)
        .map(|_| {
            let position = Vec4::point(rng.gen_range(-20.0..20.0), 0.0, rng.gen_range(-20.0..20.0));
            let velocity = Vec4::direction(rng.gen_range(-3.0..3.0), 0.0, rng.gen_range(-3.0..3.0));
            (position, velocity)
        })
        .collect();

    let step = Duration::from_millis(1000 / u64::from(CLIENT_RATE_HZ));
    let dt = step.as_secs_f32();
    let started = Instant::now();
    let deadline = Duration::from_secs(options.duration_secs);
    let mut sequence = 0u32;

    info!(players = options.players, secs = options.duration_secs, "relay running");
    while started.elapsed() < deadline {
        sequence = sequence.wrapping_add(1);
        for (player, (position, velocity)) in (0..).zip(positions.iter_mut()) {
            *position = *position + *velocity * dt;
            system.add_position_snapshot(player, *position, *velocity, 0.0, sequence);
            if rng.gen_bool(0.3) {
                system.submit_action(player, random_action(&mut rng));
            }
        }

        let poses = system.interpolate_all_positions(0.1);
        if sequence % CLIENT_RATE_HZ == 0 {
            info!(
                tracked = poses.len(),
                forwarded = bridge.call_count(),
                load = system.processing_load(),
                "relay tick"
            );
        }
        thread::sleep(step);
    }

    system.stop_processing();
    println!();
    println!("{}", system.status_report());
    println!("Bridge calls:       {}", bridge.call_count());
    system.log_statistics();
    system.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let Some(options) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "relay failed");
            ExitCode::FAILURE
        }
    }
}
