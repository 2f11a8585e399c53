use crate::cancel::CancelToken;
use crate::sink::CsvSink;
use crate::transport::Inlet;
use crate::types::Sample;
use crate::Result;
use std::io::Write;
use std::time::Duration;

/// Default bound on a single pull, short enough to notice an interrupt quickly.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_millis(500);

/// Owns an inlet and closes it exactly once, at the latest when dropped.
pub struct InletGuard<I: Inlet> {
    inlet: I,
    closed: bool,
}

impl<I: Inlet> InletGuard<I> {
    pub fn new(inlet: I) -> Self {
        Self {
            inlet,
            closed: false,
        }
    }

    pub fn pull_sample(&mut self, timeout: Duration) -> Result<Option<Sample>> {
        self.inlet.pull_sample(timeout)
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inlet.close();
            log::info!("Inlet released");
        }
    }
}

impl<I: Inlet> Drop for InletGuard<I> {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub pull_timeout: Duration,
    /// Print every logged row to stdout.
    pub echo: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            pull_timeout: DEFAULT_PULL_TIMEOUT,
            echo: true,
        }
    }
}

/// Counters reported when a logging session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub rows_written: u64,
    pub empty_pulls: u64,
}

/// Pull-decode-write loop over one inlet and one CSV sink.
pub struct SampleLogger<I: Inlet, W: Write> {
    inlet: InletGuard<I>,
    sink: CsvSink<W>,
    config: LoggerConfig,
}

impl<I: Inlet, W: Write> SampleLogger<I, W> {
    /// The sink is expected to already carry its header.
    pub fn new(inlet: I, sink: CsvSink<W>, config: LoggerConfig) -> Self {
        Self::with_guard(InletGuard::new(inlet), sink, config)
    }

    pub fn with_guard(inlet: InletGuard<I>, sink: CsvSink<W>, config: LoggerConfig) -> Self {
        Self {
            inlet,
            sink,
            config,
        }
    }

    /// Log samples until `cancel` fires. The inlet is released on every
    /// exit path, including write and transport errors.
    pub fn run(mut self, cancel: &CancelToken) -> Result<LogSummary> {
        let mut summary = LogSummary::default();

        while !cancel.is_cancelled() {
            let sample = match self.inlet.pull_sample(self.config.pull_timeout)? {
                Some(sample) => sample,
                None => {
                    summary.empty_pulls += 1;
                    continue;
                }
            };

            let row = self.sink.schema().row(&sample);
            self.sink.write_row(&row)?;
            summary.rows_written += 1;

            if self.config.echo {
                println!("LOGGED: {}", row.cells().join(" "));
            }
        }

        self.inlet.close();
        log::info!(
            "Logging stopped: {} row(s) written, {} empty pull(s)",
            summary.rows_written,
            summary.empty_pulls
        );
        Ok(summary)
    }
}
