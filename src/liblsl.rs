//! Lab Streaming Layer transport through the `lsl` crate.

use crate::transport::{Discovery, Inlet, Outlet, Publisher, StreamHandle};
use crate::types::{Sample, StreamDescriptor};
use crate::{ListenerError, Result};
use lsl::{Pullable, Pushable};
use std::time::Duration;

fn lsl_error(context: &str, err: lsl::Error) -> ListenerError {
    ListenerError::Transport(format!("{}: {:?}", context, err))
}

/// Discovery over the local network via liblsl's resolver.
#[derive(Debug, Clone)]
pub struct LslDiscovery {
    /// Inlet buffer length in seconds.
    pub max_buflen: i32,
    /// Let liblsl transparently reconnect when the publisher restarts.
    pub recover: bool,
}

impl Default for LslDiscovery {
    fn default() -> Self {
        Self {
            max_buflen: 360,
            recover: true,
        }
    }
}

/// A resolved `lsl::StreamInfo` plus its plain-data description.
#[derive(Clone)]
pub struct LslStream {
    info: lsl::StreamInfo,
    descriptor: StreamDescriptor,
}

impl LslStream {
    fn new(info: lsl::StreamInfo) -> Self {
        let descriptor = StreamDescriptor {
            name: info.stream_name(),
            stream_type: info.stream_type(),
            source_id: info.source_id(),
            channel_count: info.channel_count().max(0) as u32,
            hostname: info.hostname(),
        };
        Self { info, descriptor }
    }
}

impl StreamHandle for LslStream {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }
}

impl Discovery for LslDiscovery {
    type Stream = LslStream;
    type Inlet = LslInlet;

    fn resolve_by_name(&self, name: &str, timeout: Duration) -> Result<Vec<LslStream>> {
        let infos = lsl::resolve_byprop("name", name, 1, timeout.as_secs_f64())
            .map_err(|e| lsl_error("resolve_byprop failed", e))?;
        Ok(infos.into_iter().map(LslStream::new).collect())
    }

    fn resolve_all(&self, wait: Duration) -> Result<Vec<LslStream>> {
        let infos = lsl::resolve_streams(wait.as_secs_f64())
            .map_err(|e| lsl_error("resolve_streams failed", e))?;
        Ok(infos.into_iter().map(LslStream::new).collect())
    }

    fn open_inlet(&self, stream: &LslStream) -> Result<LslInlet> {
        let inlet = lsl::StreamInlet::new(&stream.info, self.max_buflen, 0, self.recover)
            .map_err(|e| lsl_error("Failed to create inlet", e))?;
        log::info!(
            "Opened LSL inlet on '{}' (source_id={}, host={})",
            stream.descriptor.name,
            stream.descriptor.source_id,
            stream.descriptor.hostname
        );
        Ok(LslInlet {
            inner: Some(inlet),
            name: stream.descriptor.name.clone(),
        })
    }
}

/// Connected liblsl inlet reading string samples.
pub struct LslInlet {
    inner: Option<lsl::StreamInlet>,
    name: String,
}

impl Inlet for LslInlet {
    fn pull_sample(&mut self, timeout: Duration) -> Result<Option<Sample>> {
        let inlet = self
            .inner
            .as_ref()
            .ok_or_else(|| ListenerError::Transport("Inlet already closed".into()))?;

        let (mut channels, timestamp): (Vec<String>, f64) = inlet
            .pull_sample(timeout.as_secs_f64())
            .map_err(|e| lsl_error("pull_sample failed", e))?;

        // liblsl reports "no sample within timeout" as a zero timestamp
        if timestamp == 0.0 || channels.is_empty() {
            return Ok(None);
        }
        Ok(Some(Sample {
            payload: channels.swap_remove(0),
            timestamp,
        }))
    }

    fn close(&mut self) {
        if let Some(inlet) = self.inner.take() {
            inlet.close_stream();
            log::info!("LSL inlet on '{}' closed", self.name);
        }
    }
}

impl Drop for LslInlet {
    fn drop(&mut self) {
        self.close();
    }
}

/// Outlet factory for publishing marker streams.
#[derive(Debug, Clone, Default)]
pub struct LslPublisher;

pub struct LslOutlet {
    outlet: lsl::StreamOutlet,
}

impl Publisher for LslPublisher {
    type Outlet = LslOutlet;

    fn create_outlet(&self, descriptor: &StreamDescriptor) -> Result<LslOutlet> {
        let info = lsl::StreamInfo::new(
            &descriptor.name,
            &descriptor.stream_type,
            descriptor.channel_count as _,
            lsl::IRREGULAR_RATE,
            lsl::ChannelFormat::String,
            &descriptor.source_id,
        )
        .map_err(|e| lsl_error("Failed to create stream info", e))?;
        let outlet = lsl::StreamOutlet::new(&info, 0, 360)
            .map_err(|e| lsl_error("Failed to create outlet", e))?;
        log::info!(
            "Publishing LSL stream '{}' ({})",
            descriptor.name,
            descriptor.source_id
        );
        Ok(LslOutlet { outlet })
    }
}

impl Outlet for LslOutlet {
    fn push(&self, payload: &str) -> Result<()> {
        self.outlet
            .push_sample(&vec![payload])
            .map_err(|e| lsl_error("push_sample failed", e))
    }

    fn wait_for_consumers(&self, timeout: Duration) -> bool {
        self.outlet.wait_for_consumers(timeout.as_secs_f64())
    }
}
