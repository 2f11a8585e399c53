//! Command line front end shared by the `lsl-listener` binary and tests.

use crate::cancel::CancelToken;
use crate::config::{seconds, OutputTarget, Profile, RecorderConfig, DEFAULT_STREAM_NAME};
use crate::locator::RetryPolicy;
use crate::pulse::{send_pulse, PulseConfig, TEST_MARKER};
use crate::recorder::{Recorder, SessionReport};
use crate::transport::{Discovery, Publisher, StreamHandle};
use crate::types::EventRecord;
use crate::{ListenerError, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lsl-listener", version, about = "Record LSL game event markers to CSV")]
pub struct Cli {
    /// Defaults to `record` with the session profile.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for the event stream and log every sample until Ctrl+C.
    Record(RecordArgs),
    /// Print every stream currently visible on the network.
    List(ListArgs),
    /// Publish a test marker on the event stream.
    Pulse(PulseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Recording preset.
    #[arg(long, value_enum, default_value = "session", env = "LSL_LISTENER_PROFILE")]
    pub profile: Profile,

    #[arg(long, default_value = DEFAULT_STREAM_NAME, env = "LSL_LISTENER_STREAM")]
    pub stream_name: String,

    /// Explicit log file; overrides the profile's file naming.
    #[arg(short, long, env = "LSL_LISTENER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Directory for profile-named log files.
    #[arg(long, default_value = ".", env = "LSL_LISTENER_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Seconds per discovery attempt [session: 5, append: 10].
    #[arg(long, env = "LSL_LISTENER_RESOLVE_TIMEOUT")]
    pub resolve_timeout: Option<f64>,

    /// Seconds to wait for each sample before polling again.
    #[arg(long, default_value_t = 0.5, env = "LSL_LISTENER_PULL_TIMEOUT")]
    pub pull_timeout: f64,

    /// Retry discovery every this many seconds instead of giving up.
    #[arg(long, env = "LSL_LISTENER_BACKOFF")]
    pub backoff: Option<f64>,

    /// Give up after the first empty discovery attempt.
    #[arg(long, conflicts_with = "backoff")]
    pub once: bool,

    /// Skip listing visible streams between discovery attempts.
    #[arg(long)]
    pub no_list_known: bool,

    /// Do not echo logged rows to stdout.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Default for RecordArgs {
    fn default() -> Self {
        Self {
            profile: Profile::Session,
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            output: None,
            output_dir: PathBuf::from("."),
            resolve_timeout: None,
            pull_timeout: 0.5,
            backoff: None,
            once: false,
            no_list_known: false,
            quiet: false,
        }
    }
}

impl RecordArgs {
    /// Profile defaults with command line overrides applied.
    pub fn into_config(self) -> Result<RecorderConfig> {
        let mut config = RecorderConfig::for_profile(self.profile);
        config.locator.stream_name = self.stream_name;

        if let Some(t) = self.resolve_timeout {
            config.locator.attempt_timeout = seconds("resolve timeout", t)?;
        }
        if let Some(b) = self.backoff {
            config.locator.retry = RetryPolicy::Forever {
                backoff: seconds("backoff", b)?,
            };
        }
        if self.once {
            config.locator.retry = RetryPolicy::Once;
        }
        if self.no_list_known {
            config.locator.list_known = false;
        }
        config.logger.pull_timeout = seconds("pull timeout", self.pull_timeout)?;
        config.logger.echo = !self.quiet;

        config.output = match (self.output, config.output) {
            (Some(path), _) => OutputTarget::Fixed(path),
            (None, OutputTarget::Timestamped { .. }) => OutputTarget::Timestamped {
                dir: self.output_dir,
            },
            (None, OutputTarget::Fixed(name)) => OutputTarget::Fixed(self.output_dir.join(name)),
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Seconds to gather discovery responses.
    #[arg(long, default_value_t = 2.0)]
    pub wait: f64,
}

#[derive(Args, Debug, Clone)]
pub struct PulseArgs {
    #[arg(long, default_value = DEFAULT_STREAM_NAME, env = "LSL_LISTENER_STREAM")]
    pub stream_name: String,

    /// Raw payload [default: TEST_CONNECTION_SUCCESS].
    #[arg(short, long, conflicts_with_all = ["scene", "user", "event", "context", "value"])]
    pub message: Option<String>,

    #[arg(long)]
    pub scene: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub event: Option<String>,
    #[arg(long)]
    pub context: Option<String>,
    #[arg(long)]
    pub value: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Seconds between repeated pushes.
    #[arg(long, default_value_t = 1.0)]
    pub interval: f64,

    /// Seconds to keep the outlet up before and after pushing.
    #[arg(long, default_value_t = 2.0)]
    pub linger: f64,
}

impl PulseArgs {
    /// The payload to publish: a structured event if any field was given,
    /// otherwise the raw message.
    pub fn payload(&self) -> String {
        let fields = [&self.scene, &self.user, &self.event, &self.context, &self.value];
        if fields.iter().any(|f| f.is_some()) {
            let field = |f: &Option<String>| f.clone().unwrap_or_default();
            return EventRecord {
                scene_name: field(&self.scene),
                user_id: field(&self.user),
                event_type: field(&self.event),
                context: field(&self.context),
                value: field(&self.value),
            }
            .to_payload();
        }
        self.message.clone().unwrap_or_else(|| TEST_MARKER.to_string())
    }

    pub fn to_config(&self) -> Result<PulseConfig> {
        let mut config = PulseConfig::new(&self.stream_name);
        config.count = self.count;
        config.interval = seconds("interval", self.interval)?;
        config.linger = seconds("linger", self.linger)?;
        Ok(config)
    }
}

/// `record`: locate the stream and log until interrupted.
pub fn run_record<D: Discovery>(
    discovery: &D,
    args: RecordArgs,
    cancel: &CancelToken,
) -> Result<SessionReport> {
    let config = args.into_config()?;
    let mut recorder = Recorder::new(discovery, config)?;

    match recorder.run(cancel) {
        Ok(report) => {
            println!("\nExiting cleanly...");
            println!("LSL inlet closed");
            println!(
                "Wrote {} row(s) to {}",
                report.summary.rows_written,
                report.path.display()
            );
            Ok(report)
        }
        Err(ListenerError::Interrupted) => {
            println!("Interrupted while waiting for stream. Exiting.");
            Err(ListenerError::Interrupted)
        }
        Err(e) => Err(e),
    }
}

/// `list`: one-shot enumeration of visible streams.
pub fn run_list<D: Discovery>(discovery: &D, args: &ListArgs) -> Result<usize> {
    println!("Resolving streams...");
    let streams = discovery.resolve_all(seconds("wait", args.wait)?)?;
    println!("Found {} stream(s):", streams.len());
    for (i, stream) in streams.iter().enumerate() {
        let d = stream.descriptor();
        println!(
            "  [{}] name={}  type={}  channels={}  source_id={}  host={}",
            i, d.name, d.stream_type, d.channel_count, d.source_id, d.hostname
        );
    }
    Ok(streams.len())
}

/// `pulse`: publish a test payload.
pub fn run_pulse<P: Publisher>(
    publisher: &P,
    args: &PulseArgs,
    cancel: &CancelToken,
) -> Result<u32> {
    let config = args.to_config()?;
    let payload = args.payload();
    println!("Publishing '{}' on {}...", payload, config.stream.name);
    let sent = send_pulse(publisher, &config, &payload, cancel)?;
    println!("Sent {} marker(s)", sent);
    Ok(sent)
}

/// Dispatch a parsed command line against the liblsl backend.
#[cfg(feature = "lsl")]
pub fn run(cli: Cli, cancel: &CancelToken) -> Result<()> {
    use crate::liblsl::{LslDiscovery, LslPublisher};

    match cli.command.unwrap_or_else(|| Command::Record(RecordArgs::default())) {
        Command::Record(args) => run_record(&LslDiscovery::default(), args, cancel).map(|_| ()),
        Command::List(args) => run_list(&LslDiscovery::default(), &args).map(|_| ()),
        Command::Pulse(args) => run_pulse(&LslPublisher, &args, cancel).map(|_| ()),
    }
}

#[cfg(not(feature = "lsl"))]
pub fn run(_cli: Cli, _cancel: &CancelToken) -> Result<()> {
    Err(ListenerError::Unsupported(
        "built without the `lsl` feature; drop `--no-default-features` to reach LSL streams"
            .into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Schema;
    use std::time::Duration;

    #[test]
    fn test_no_subcommand_defaults_to_record() {
        let cli = Cli::try_parse_from(["lsl-listener"]).unwrap();
        assert!(cli.command.is_none());

        let config = RecordArgs::default().into_config().unwrap();
        assert_eq!(config.schema, Schema::Event);
        assert_eq!(config.locator.stream_name, "StealthGame_Events");
    }

    #[test]
    fn test_record_overrides() {
        let cli = Cli::try_parse_from([
            "lsl-listener",
            "record",
            "--profile",
            "append",
            "--output-dir",
            "logs",
            "--resolve-timeout",
            "3",
            "--pull-timeout",
            "0.25",
            "--quiet",
        ])
        .unwrap();
        let Some(Command::Record(args)) = cli.command else {
            panic!("expected record");
        };
        let config = args.into_config().unwrap();

        assert_eq!(config.schema, Schema::Raw);
        assert_eq!(config.output, OutputTarget::Fixed(PathBuf::from("logs").join("game_logs.csv")));
        assert_eq!(config.locator.attempt_timeout, Duration::from_secs(3));
        assert_eq!(config.locator.retry, RetryPolicy::Once);
        assert_eq!(config.logger.pull_timeout, Duration::from_millis(250));
        assert!(!config.logger.echo);
    }

    #[test]
    fn test_backoff_turns_append_into_retry() {
        let args = RecordArgs {
            profile: Profile::Append,
            backoff: Some(2.0),
            ..RecordArgs::default()
        };
        let config = args.into_config().unwrap();
        assert_eq!(
            config.locator.retry,
            RetryPolicy::Forever {
                backoff: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn test_explicit_output_wins() {
        let args = RecordArgs {
            output: Some(PathBuf::from("mine.csv")),
            ..RecordArgs::default()
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.output, OutputTarget::Fixed(PathBuf::from("mine.csv")));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let args = RecordArgs {
            pull_timeout: -1.0,
            ..RecordArgs::default()
        };
        assert!(matches!(args.into_config(), Err(ListenerError::Config(_))));
    }

    #[test]
    fn test_pulse_payloads() {
        let cli = Cli::try_parse_from(["lsl-listener", "pulse"]).unwrap();
        let Some(Command::Pulse(args)) = cli.command else {
            panic!("expected pulse");
        };
        assert_eq!(args.payload(), "TEST_CONNECTION_SUCCESS");

        let cli = Cli::try_parse_from([
            "lsl-listener",
            "pulse",
            "--scene",
            "Hallway",
            "--user",
            "U7",
            "--event",
            "detected",
        ])
        .unwrap();
        let Some(Command::Pulse(args)) = cli.command else {
            panic!("expected pulse");
        };
        assert_eq!(args.payload(), "Hallway|U7|detected||");

        assert!(Cli::try_parse_from(["lsl-listener", "pulse", "-m", "x", "--scene", "y"]).is_err());
    }
}
