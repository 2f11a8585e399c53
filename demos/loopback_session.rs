//! Simulate a game publishing events and record them, all in-process.
//!
//! Usage: cargo run --example loopback_session
//! Press Ctrl+C to stop early; otherwise the game thread stops after ~3s.

use lsl_listener::loopback::LoopbackBus;
use lsl_listener::transport::{Outlet, Publisher};
use lsl_listener::{CancelToken, Profile, Recorder, RecorderConfig, StreamDescriptor};
use std::time::{Duration, Instant};

const EVENTS: &[&str] = &[
    "Hallway|U7|detected|guard1|0.8",
    "Hallway|U7|hidden|crate|",
    "Vault|U7|key_pickup|blue|1",
    "Vault|U7|quiz_answer|q3|correct",
    "Exit|U7|level_complete||42.7",
];

fn main() {
    env_logger::init();

    let cancel = match CancelToken::from_ctrlc() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to install Ctrl+C handler: {}", e);
            std::process::exit(1);
        }
    };

    let bus = LoopbackBus::new();
    let game_bus = bus.clone();
    let game_cancel = cancel.clone();

    let game = std::thread::Builder::new()
        .name("fake-game".into())
        .spawn(move || {
            // Come up late so the recorder prints a couple of discovery diagnostics.
            std::thread::sleep(Duration::from_millis(1500));
            let descriptor = StreamDescriptor::markers("StealthGame_Events", "fake-game");
            let outlet = match game_bus.create_outlet(&descriptor) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("Failed to create outlet: {}", e);
                    return;
                }
            };
            let start = Instant::now();
            for event in EVENTS.iter().cycle() {
                let done = start.elapsed() > Duration::from_secs(3);
                if done || game_cancel.sleep(Duration::from_millis(200)) {
                    break;
                }
                if let Err(e) = outlet.push(event) {
                    eprintln!("Push failed: {}", e);
                    break;
                }
            }
            game_cancel.cancel();
        })
        .unwrap_or_else(|e| {
            eprintln!("Failed to spawn game thread: {}", e);
            std::process::exit(1);
        });

    let mut config = RecorderConfig::for_profile(Profile::Session);
    config.locator.attempt_timeout = Duration::from_millis(500);
    config.locator.list_wait = Duration::ZERO;
    config.output = lsl_listener::config::OutputTarget::Timestamped {
        dir: std::env::temp_dir(),
    };

    let result = Recorder::new(&bus, config).and_then(|mut r| r.run(&cancel));
    let _ = game.join();

    match result {
        Ok(report) => println!(
            "\nTotal: {} rows in {} ({} empty pulls)",
            report.summary.rows_written,
            report.path.display(),
            report.summary.empty_pulls
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
