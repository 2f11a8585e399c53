use crate::locator::{LocatorConfig, RetryPolicy};
use crate::logger::{LoggerConfig, DEFAULT_PULL_TIMEOUT};
use crate::sink::{FileMode, Schema};
use crate::{ListenerError, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the stream the game publishes its events on.
pub const DEFAULT_STREAM_NAME: &str = "StealthGame_Events";

/// Log file used by the append profile.
pub const APPEND_FILE_NAME: &str = "game_logs.csv";

/// Recording presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// Wait for the stream indefinitely, decode event fields, one fresh
    /// timestamped file per run.
    Session,
    /// Single discovery attempt, raw payloads appended to `game_logs.csv`.
    Append,
}

/// Everything a profile decides.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub attempt_timeout: Duration,
    pub retry: RetryPolicy,
    pub list_known: bool,
    pub schema: Schema,
    pub file_mode: FileMode,
}

impl Profile {
    pub fn settings(self) -> ProfileSettings {
        match self {
            Profile::Session => ProfileSettings {
                attempt_timeout: Duration::from_secs(5),
                retry: RetryPolicy::Forever {
                    backoff: Duration::from_secs(1),
                },
                list_known: true,
                schema: Schema::Event,
                file_mode: FileMode::Truncate,
            },
            Profile::Append => ProfileSettings {
                attempt_timeout: Duration::from_secs(10),
                retry: RetryPolicy::Once,
                list_known: false,
                schema: Schema::Raw,
                file_mode: FileMode::Append,
            },
        }
    }
}

/// `game_logs_<YYYY-MM-DD_HH-MM-SS>.csv`
pub fn session_file_name(now: &DateTime<Local>) -> String {
    format!("game_logs_{}.csv", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Where a recording goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A new file named after the start time, inside `dir`.
    Timestamped { dir: PathBuf },
    Fixed(PathBuf),
}

impl OutputTarget {
    pub fn resolve(&self, now: &DateTime<Local>) -> PathBuf {
        match self {
            OutputTarget::Timestamped { dir } => dir.join(session_file_name(now)),
            OutputTarget::Fixed(path) => path.clone(),
        }
    }
}

/// Fully resolved settings for one recording run.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub locator: LocatorConfig,
    pub logger: LoggerConfig,
    pub schema: Schema,
    pub file_mode: FileMode,
    pub output: OutputTarget,
}

impl RecorderConfig {
    /// Profile defaults, writing next to the working directory.
    pub fn for_profile(profile: Profile) -> Self {
        let settings = profile.settings();
        let output = match settings.file_mode {
            FileMode::Truncate => OutputTarget::Timestamped {
                dir: PathBuf::from("."),
            },
            FileMode::Append => OutputTarget::Fixed(PathBuf::from(APPEND_FILE_NAME)),
        };

        RecorderConfig {
            locator: LocatorConfig {
                stream_name: DEFAULT_STREAM_NAME.to_string(),
                attempt_timeout: settings.attempt_timeout,
                retry: settings.retry,
                list_known: settings.list_known,
                list_wait: Duration::from_secs(1),
                poll_slice: Duration::from_secs(1),
            },
            logger: LoggerConfig {
                pull_timeout: DEFAULT_PULL_TIMEOUT,
                echo: true,
            },
            schema: settings.schema,
            file_mode: settings.file_mode,
            output,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.locator.stream_name.trim().is_empty() {
            return Err(ListenerError::Config("stream name must not be empty".into()));
        }
        if self.logger.pull_timeout.is_zero() {
            return Err(ListenerError::Config("pull timeout must be positive".into()));
        }
        if self.locator.poll_slice.is_zero() {
            return Err(ListenerError::Config("discovery poll slice must be positive".into()));
        }
        Ok(())
    }
}

/// Seconds from the command line or environment as a `Duration`.
pub fn seconds(what: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ListenerError::Config(format!(
            "{} must be a non-negative number of seconds, got {}",
            what, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(session_file_name(&now), "game_logs_2024-03-09_07-05-01.csv");
    }

    #[test]
    fn test_profiles() {
        let session = RecorderConfig::for_profile(Profile::Session);
        assert_eq!(session.schema, Schema::Event);
        assert_eq!(session.file_mode, FileMode::Truncate);
        assert_eq!(session.locator.attempt_timeout, Duration::from_secs(5));
        assert_eq!(
            session.locator.retry,
            RetryPolicy::Forever {
                backoff: Duration::from_secs(1)
            }
        );
        assert!(session.locator.list_known);

        let append = RecorderConfig::for_profile(Profile::Append);
        assert_eq!(append.schema, Schema::Raw);
        assert_eq!(append.locator.retry, RetryPolicy::Once);
        assert_eq!(append.locator.attempt_timeout, Duration::from_secs(10));
        assert_eq!(append.output, OutputTarget::Fixed(PathBuf::from("game_logs.csv")));

        for cfg in [session, append] {
            assert_eq!(cfg.locator.stream_name, "StealthGame_Events");
            assert_eq!(cfg.logger.pull_timeout, Duration::from_millis(500));
            cfg.validate().unwrap();
        }
    }

    #[test]
    fn test_output_target_resolve() {
        let now = Local.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let target = OutputTarget::Timestamped {
            dir: PathBuf::from("logs"),
        };
        assert_eq!(
            target.resolve(&now),
            PathBuf::from("logs").join("game_logs_2025-12-31_23-59-59.csv")
        );
        assert_eq!(
            OutputTarget::Fixed(PathBuf::from("x.csv")).resolve(&now),
            PathBuf::from("x.csv")
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = RecorderConfig::for_profile(Profile::Session);
        cfg.locator.stream_name = "  ".into();
        assert!(matches!(cfg.validate(), Err(ListenerError::Config(_))));

        let mut cfg = RecorderConfig::for_profile(Profile::Append);
        cfg.logger.pull_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_seconds() {
        assert_eq!(seconds("backoff", 0.5).unwrap(), Duration::from_millis(500));
        assert!(seconds("backoff", -1.0).is_err());
        assert!(seconds("backoff", f64::NAN).is_err());
    }
}
