//! # lsl-listener - record Lab Streaming Layer game events to CSV
//!
//! Waits for the `StealthGame_Events` marker stream, then logs every
//! sample to a CSV file, flushing each row before the next pull, until the
//! operator interrupts. Provides:
//! - Stream discovery with retry, backoff and known-stream diagnostics
//! - Two recording profiles: decoded events in a fresh timestamped file, or
//!   raw payloads appended to `game_logs.csv`
//! - A `liblsl` transport (feature `lsl`) and an in-process `loopback` one
//!
//! ## Features
//! `lsl` is on by default and builds liblsl from C++ source, which needs
//! cmake and a C++ toolchain. Build with `--no-default-features` to skip it;
//! the library, loopback backend, tests and `loopback_session` demo still
//! work, and the binary reports that the `lsl` feature is missing.
//!
//! ## Quick Start
//! ```no_run
//! use lsl_listener::{CancelToken, Profile, Recorder, RecorderConfig};
//! use lsl_listener::loopback::LoopbackBus;
//!
//! let bus = LoopbackBus::new();
//! let cancel = CancelToken::from_ctrlc().unwrap();
//! let mut recorder = Recorder::new(&bus, RecorderConfig::for_profile(Profile::Session)).unwrap();
//! let report = recorder.run(&cancel).unwrap();
//! println!("{} rows in {}", report.summary.rows_written, report.path.display());
//! ```

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
#[cfg(feature = "lsl")]
pub mod liblsl;
pub mod locator;
pub mod logger;
pub mod loopback;
pub mod pulse;
pub mod recorder;
pub mod sink;
pub mod transport;
pub mod types;

pub use cancel::CancelToken;
pub use config::{Profile, RecorderConfig};
pub use error::ListenerError;
pub use recorder::{Recorder, SessionReport};
pub use types::*;

/// Result type alias for listener operations.
pub type Result<T> = std::result::Result<T, ListenerError>;
