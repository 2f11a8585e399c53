use crate::cancel::CancelToken;
use crate::transport::{Discovery, StreamHandle};
use crate::{ListenerError, Result};
use std::time::{Duration, Instant};

/// What to do after a discovery attempt comes back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Give up with `StreamNotFound`.
    Once,
    /// Wait `backoff` and query again until found or cancelled.
    Forever { backoff: Duration },
}

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub stream_name: String,
    /// Total time one discovery attempt may take.
    pub attempt_timeout: Duration,
    pub retry: RetryPolicy,
    /// Print the names of all visible streams after an empty attempt.
    pub list_known: bool,
    /// How long the "all streams" enumeration gathers results.
    pub list_wait: Duration,
    /// Longest single blocking discovery call; cancellation is checked between calls.
    pub poll_slice: Duration,
}

/// Repeatedly queries a discovery backend for one named stream.
pub struct StreamLocator<'a, D: Discovery> {
    discovery: &'a D,
    config: LocatorConfig,
}

impl<'a, D: Discovery> StreamLocator<'a, D> {
    pub fn new(discovery: &'a D, config: LocatorConfig) -> Self {
        Self { discovery, config }
    }

    /// Block until a stream with the configured name is visible and return
    /// the first match.
    ///
    /// Fails with `Interrupted` when `cancel` fires first, or with
    /// `StreamNotFound` when the policy is `Once` and the attempt is empty.
    pub fn locate(&self, cancel: &CancelToken) -> Result<D::Stream> {
        let name = &self.config.stream_name;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ListenerError::Interrupted);
            }
            attempt += 1;
            log::debug!("Discovery attempt {} for '{}'", attempt, name);

            if let Some(stream) = self.attempt(cancel)? {
                log::info!(
                    "Found stream '{}' (type={}, source_id={}) after {} attempt(s)",
                    stream.descriptor().name,
                    stream.descriptor().stream_type,
                    stream.descriptor().source_id,
                    attempt
                );
                return Ok(stream);
            }

            match self.config.retry {
                RetryPolicy::Once => {
                    return Err(ListenerError::StreamNotFound {
                        name: name.clone(),
                        timeout: self.config.attempt_timeout,
                    });
                }
                RetryPolicy::Forever { backoff } => {
                    if self.config.list_known {
                        self.report_known_streams();
                    } else {
                        println!("No matching stream yet. Retrying...");
                    }
                    if cancel.sleep(backoff) {
                        return Err(ListenerError::Interrupted);
                    }
                }
            }
        }
    }

    /// One discovery attempt, split into slices so an interrupt is noticed
    /// without waiting out the whole timeout.
    fn attempt(&self, cancel: &CancelToken) -> Result<Option<D::Stream>> {
        let deadline = Instant::now() + self.config.attempt_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let slice = remaining.min(self.config.poll_slice);
            let mut found = self
                .discovery
                .resolve_by_name(&self.config.stream_name, slice)?;
            if !found.is_empty() {
                if found.len() > 1 {
                    log::warn!(
                        "{} streams named '{}' are visible, using the first",
                        found.len(),
                        self.config.stream_name
                    );
                }
                return Ok(Some(found.swap_remove(0)));
            }
            if cancel.is_cancelled() {
                return Err(ListenerError::Interrupted);
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn report_known_streams(&self) {
        match self.discovery.resolve_all(self.config.list_wait) {
            Ok(streams) => {
                let names: Vec<&str> = streams
                    .iter()
                    .map(|s| s.descriptor().name.as_str())
                    .collect();
                println!("No matching stream yet. Known streams: {:?}. Retrying...", names);
            }
            Err(e) => {
                log::warn!("Listing visible streams failed: {}", e);
                println!("No matching stream yet. Retrying...");
            }
        }
    }
}
