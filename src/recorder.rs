use crate::cancel::CancelToken;
use crate::config::RecorderConfig;
use crate::locator::StreamLocator;
use crate::logger::{InletGuard, LogSummary, SampleLogger};
use crate::sink::{open_log_file, CsvSink};
use crate::transport::{Discovery, StreamHandle};
use crate::Result;
use chrono::Local;
use std::path::PathBuf;

/// Lifecycle of a recording run.
///
/// `Closed` is terminal: `Recorder::run` ends there whether the session
/// stopped on interrupt, failed discovery or hit an error while logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForStream,
    Connected,
    Logging,
    Closed,
}

/// Outcome of a recording that ended by operator interrupt.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub path: PathBuf,
    pub stream_name: String,
    pub summary: LogSummary,
}

/// Locates the configured stream, opens the log file and runs the sample
/// logger until cancelled.
pub struct Recorder<'a, D: Discovery> {
    discovery: &'a D,
    config: RecorderConfig,
    state: SessionState,
}

impl<'a, D: Discovery> Recorder<'a, D> {
    pub fn new(discovery: &'a D, config: RecorderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            discovery,
            config,
            state: SessionState::WaitingForStream,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn enter(&mut self, state: SessionState) {
        log::debug!("Session state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Run one recording session.
    ///
    /// Nothing is written to disk until a stream has been found, so a failed
    /// or interrupted discovery leaves no file behind.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<SessionReport> {
        let result = self.record(cancel);
        if let Err(e) = &result {
            log::debug!("Session ended in {:?}: {}", self.state, e);
        }
        self.enter(SessionState::Closed);
        result
    }

    fn record(&mut self, cancel: &CancelToken) -> Result<SessionReport> {
        self.enter(SessionState::WaitingForStream);
        println!("Waiting for {} stream...", self.config.locator.stream_name);

        let locator = StreamLocator::new(self.discovery, self.config.locator.clone());
        let stream = locator.locate(cancel)?;
        let stream_name = stream.descriptor().name.clone();
        let inlet = InletGuard::new(self.discovery.open_inlet(&stream)?);
        self.enter(SessionState::Connected);
        println!("Connected to LSL stream");
        println!("Press Ctrl+C or close the window to exit");

        let path = self.config.output.resolve(&Local::now());
        let (file, needs_header) = open_log_file(&path, self.config.file_mode)?;
        let mut sink = CsvSink::new(file, self.config.schema);
        if needs_header {
            sink.write_header()?;
        }
        log::info!("Logging '{}' to {}", stream_name, path.display());

        self.enter(SessionState::Logging);
        let summary =
            SampleLogger::with_guard(inlet, sink, self.config.logger.clone()).run(cancel)?;

        Ok(SessionReport {
            path,
            stream_name,
            summary,
        })
    }
}
