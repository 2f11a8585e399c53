//! Record the game's LSL event stream to CSV.
//!
//! Usage: lsl-listener [record|list|pulse] [OPTIONS]
//! Press Ctrl+C to stop recording.

use clap::Parser;
use lsl_listener::cli::{self, Cli};
use lsl_listener::CancelToken;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Command line: {:?}", cli);

    let cancel = match CancelToken::from_ctrlc() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = cli::run(cli, &cancel) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
