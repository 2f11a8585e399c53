//! List all LSL streams visible on the network.
//!
//! Usage: cargo run --example enumerate

use lsl_listener::liblsl::LslDiscovery;
use lsl_listener::transport::{Discovery, StreamHandle};
use std::time::Duration;

fn main() {
    env_logger::init();

    match LslDiscovery::default().resolve_all(Duration::from_secs(2)) {
        Ok(streams) => {
            println!("Found {} stream(s):", streams.len());
            for (i, stream) in streams.iter().enumerate() {
                let d = stream.descriptor();
                println!(
                    "  [{}] name={}  type={}  channels={}  source_id={}  host={}",
                    i, d.name, d.stream_type, d.channel_count, d.source_id, d.hostname
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
