//! Seams between the recorder and the streaming library.
//!
//! The locator and logger only talk to these traits. `liblsl` (feature
//! `lsl`) implements them on top of the real Lab Streaming Layer, and
//! `loopback` implements them in-process for demos and tests.

use crate::types::{Sample, StreamDescriptor};
use crate::Result;
use std::time::Duration;

/// A backend-specific handle to a discovered stream.
pub trait StreamHandle {
    fn descriptor(&self) -> &StreamDescriptor;
}

impl StreamHandle for StreamDescriptor {
    fn descriptor(&self) -> &StreamDescriptor {
        self
    }
}

/// Read side of a connected stream.
pub trait Inlet {
    /// Wait at most `timeout` for the next sample. `Ok(None)` means nothing
    /// arrived in time, which is not an error.
    fn pull_sample(&mut self, timeout: Duration) -> Result<Option<Sample>>;

    /// Release the underlying connection. Calling it again is a no-op.
    fn close(&mut self);
}

/// Stream discovery and inlet creation.
pub trait Discovery {
    type Stream: StreamHandle;
    type Inlet: Inlet;

    /// Streams whose `name` property equals `name`, waiting up to `timeout`
    /// for at least one to appear.
    fn resolve_by_name(&self, name: &str, timeout: Duration) -> Result<Vec<Self::Stream>>;

    /// Every stream currently visible, gathered for up to `wait`.
    fn resolve_all(&self, wait: Duration) -> Result<Vec<Self::Stream>>;

    fn open_inlet(&self, stream: &Self::Stream) -> Result<Self::Inlet>;
}

/// Write side of a published stream.
pub trait Outlet {
    fn push(&self, payload: &str) -> Result<()>;

    /// Block until at least one inlet is connected or `timeout` passes.
    /// Returns whether a consumer is connected.
    fn wait_for_consumers(&self, timeout: Duration) -> bool;
}

/// Creates outlets that make a stream visible to listeners.
pub trait Publisher {
    type Outlet: Outlet;

    fn create_outlet(&self, descriptor: &StreamDescriptor) -> Result<Self::Outlet>;
}
