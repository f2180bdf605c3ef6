//! Stepcount demo
//!
//! Feeds a synthetic walk through a session and prints the metrics.
//! Set `RUST_LOG=debug` to watch steps being confirmed.
//!
//! Usage: `stepcount-demo [config.json]`

use std::f32::consts::PI;
use std::process::ExitCode;

use stepcount::{AccelSample, EngineConfig, Gender, Session, UserProfile};

const SAMPLE_PERIOD_MS: u64 = 20;
const WALK_MS: u64 = 30_000;
const STILL_MS: u64 = 5_000;
const CADENCE_HZ: f32 = 2.0;

fn load_config() -> stepcount::Result<EngineConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| stepcount::PedometerError::InvalidConfig(format!("{}: {}", path, e)))?;
            EngineConfig::from_json(&json)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Walking at `CADENCE_HZ`, then standing still.
fn synthetic_walk() -> impl Iterator<Item = AccelSample> {
    (0..(WALK_MS + STILL_MS) / SAMPLE_PERIOD_MS).map(|i| {
        let timestamp_ms = i * SAMPLE_PERIOD_MS;
        let z = if timestamp_ms < WALK_MS {
            let t = timestamp_ms as f32 / 1000.0;
            9.81 + 3.0 * (2.0 * PI * CADENCE_HZ * t).sin()
        } else {
            9.81
        };
        AccelSample::new(timestamp_ms, [0.1, 0.2, z])
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let profile = UserProfile::new(Gender::Female, 30, 165, 60);
    let mut session = match Session::new(config, profile) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Stepcount demo v{}", env!("CARGO_PKG_VERSION"));
    println!("Topology: {:?}", session.topology());

    for sample in synthetic_walk() {
        session.process(&sample);
    }

    println!("Steps:        {}", session.steps());
    println!("Distance:     {:.2} m", session.distance());
    match session.steps_per_sec() {
        Ok(rate) => println!("Cadence:      {:.2} steps/s", rate),
        Err(e) => println!("Cadence:      n/a ({})", e),
    }
    println!("Calories:     {:.3} kcal", session.calories());
    println!("Peak spacing: {:.0} ms", session.mean_peak_time());

    ExitCode::SUCCESS
}
