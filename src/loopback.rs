use crate::transport::{Discovery, Inlet, Outlet, Publisher};
use crate::types::{Sample, StreamDescriptor};
use crate::{ListenerError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Per-inlet queue depth. Samples beyond this are dropped for that inlet.
const INLET_QUEUE: usize = 1024;

/// How often `resolve_by_name` and `wait_for_consumers` re-check the registry.
const RESOLVE_POLL: Duration = Duration::from_millis(10);

struct Subscriber {
    id: u64,
    sender: Sender<Sample>,
}

struct StreamEntry {
    id: u64,
    descriptor: StreamDescriptor,
    subscribers: Vec<Subscriber>,
}

struct BusState {
    next_id: u64,
    streams: Vec<StreamEntry>,
}

/// In-process stand-in for the LSL network.
///
/// Outlets register named streams on the bus; every inlet opened on a
/// stream gets its own bounded queue, so several listeners can read the
/// same stream independently. Dropping an outlet delists its stream.
#[derive(Clone)]
pub struct LoopbackBus {
    epoch: Instant,
    state: Arc<Mutex<BusState>>,
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            state: Arc::new(Mutex::new(BusState {
                next_id: 0,
                streams: Vec::new(),
            })),
        }
    }

    /// Seconds since the bus was created; the loopback "local clock".
    pub fn clock(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Number of inlets currently connected to streams named `name`.
    pub fn connected_inlets(&self, name: &str) -> usize {
        self.state()
            .streams
            .iter()
            .filter(|s| s.descriptor.name == name)
            .map(|s| s.subscribers.len())
            .sum()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self, name: Option<&str>) -> Vec<LoopbackStream> {
        self.state()
            .streams
            .iter()
            .filter(|s| name.map_or(true, |n| s.descriptor.name == n))
            .map(|s| LoopbackStream {
                id: s.id,
                descriptor: s.descriptor.clone(),
            })
            .collect()
    }
}

/// A stream found on the loopback bus.
#[derive(Debug, Clone)]
pub struct LoopbackStream {
    id: u64,
    descriptor: StreamDescriptor,
}

impl crate::transport::StreamHandle for LoopbackStream {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }
}

impl Discovery for LoopbackBus {
    type Stream = LoopbackStream;
    type Inlet = LoopbackInlet;

    fn resolve_by_name(&self, name: &str, timeout: Duration) -> Result<Vec<LoopbackStream>> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.snapshot(Some(name));
            let now = Instant::now();
            if !found.is_empty() || now >= deadline {
                return Ok(found);
            }
            std::thread::sleep(RESOLVE_POLL.min(deadline - now));
        }
    }

    fn resolve_all(&self, _wait: Duration) -> Result<Vec<LoopbackStream>> {
        Ok(self.snapshot(None))
    }

    fn open_inlet(&self, stream: &LoopbackStream) -> Result<LoopbackInlet> {
        let (sender, receiver) = crossbeam_channel::bounded(INLET_QUEUE);
        let mut state = self.state();
        let subscriber_id = state.next_id;
        state.next_id += 1;

        let entry = state
            .streams
            .iter_mut()
            .find(|s| s.id == stream.id)
            .ok_or_else(|| {
                ListenerError::Transport(format!("Stream '{}' is gone", stream.descriptor.name))
            })?;
        entry.subscribers.push(Subscriber {
            id: subscriber_id,
            sender,
        });
        log::debug!("Loopback inlet {} opened on '{}'", subscriber_id, stream.descriptor.name);

        Ok(LoopbackInlet {
            bus: self.clone(),
            stream_id: stream.id,
            subscriber_id,
            receiver: Some(receiver),
        })
    }
}

/// Read handle on a loopback stream.
pub struct LoopbackInlet {
    bus: LoopbackBus,
    stream_id: u64,
    subscriber_id: u64,
    receiver: Option<Receiver<Sample>>,
}

impl Inlet for LoopbackInlet {
    fn pull_sample(&mut self, timeout: Duration) -> Result<Option<Sample>> {
        let receiver = self
            .receiver
            .as_ref()
            .ok_or_else(|| ListenerError::Transport("Inlet already closed".into()))?;

        match receiver.recv_timeout(timeout) {
            Ok(sample) => Ok(Some(sample)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(ListenerError::Transport("Stream was closed by its publisher".into()))
            }
        }
    }

    fn close(&mut self) {
        if self.receiver.take().is_none() {
            return;
        }
        let mut state = self.bus.state();
        if let Some(entry) = state.streams.iter_mut().find(|s| s.id == self.stream_id) {
            entry.subscribers.retain(|s| s.id != self.subscriber_id);
        }
        log::debug!("Loopback inlet {} closed", self.subscriber_id);
    }
}

impl Drop for LoopbackInlet {
    fn drop(&mut self) {
        self.close();
    }
}

impl Publisher for LoopbackBus {
    type Outlet = LoopbackOutlet;

    fn create_outlet(&self, descriptor: &StreamDescriptor) -> Result<LoopbackOutlet> {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        state.streams.push(StreamEntry {
            id,
            descriptor: descriptor.clone(),
            subscribers: Vec::new(),
        });
        log::debug!("Loopback outlet '{}' registered", descriptor.name);

        Ok(LoopbackOutlet {
            bus: self.clone(),
            stream_id: id,
        })
    }
}

/// Publishing handle; the stream stays visible while this is alive.
pub struct LoopbackOutlet {
    bus: LoopbackBus,
    stream_id: u64,
}

impl LoopbackOutlet {
    /// Push with an explicit timestamp instead of the bus clock.
    pub fn push_at(&self, payload: &str, timestamp: f64) -> Result<()> {
        let mut state = self.bus.state();
        let entry = state
            .streams
            .iter_mut()
            .find(|s| s.id == self.stream_id)
            .ok_or_else(|| ListenerError::Transport("Outlet is no longer registered".into()))?;

        let sample = Sample {
            payload: payload.to_string(),
            timestamp,
        };
        entry.subscribers.retain(|sub| match sub.sender.try_send(sample.clone()) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                log::trace!("Loopback inlet {} full, dropping sample", sub.id);
                true
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        });
        Ok(())
    }

    pub fn has_consumers(&self) -> bool {
        self.bus
            .state()
            .streams
            .iter()
            .any(|s| s.id == self.stream_id && !s.subscribers.is_empty())
    }
}

impl Outlet for LoopbackOutlet {
    fn push(&self, payload: &str) -> Result<()> {
        self.push_at(payload, self.bus.clock())
    }

    fn wait_for_consumers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_consumers() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(RESOLVE_POLL.min(deadline - now));
        }
    }
}

impl Drop for LoopbackOutlet {
    fn drop(&mut self) {
        self.bus.state().streams.retain(|s| s.id != self.stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StreamHandle;

    fn markers(name: &str) -> StreamDescriptor {
        StreamDescriptor::markers(name, "test-source")
    }

    #[test]
    fn test_resolve_by_name_filters() {
        let bus = LoopbackBus::new();
        let _a = bus.create_outlet(&markers("StealthGame_Events")).unwrap();
        let _b = bus.create_outlet(&markers("Other")).unwrap();

        let found = bus.resolve_by_name("StealthGame_Events", Duration::ZERO).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].descriptor().name, "StealthGame_Events");
        assert_eq!(bus.resolve_all(Duration::ZERO).unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_times_out_empty() {
        let bus = LoopbackBus::new();
        let start = Instant::now();
        let found = bus.resolve_by_name("Missing", Duration::from_millis(50)).unwrap();
        assert!(found.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_samples_arrive_in_order() {
        let bus = LoopbackBus::new();
        let outlet = bus.create_outlet(&markers("S")).unwrap();
        let stream = bus.resolve_by_name("S", Duration::ZERO).unwrap().remove(0);
        let mut inlet = bus.open_inlet(&stream).unwrap();

        outlet.push_at("first", 1.0).unwrap();
        outlet.push_at("second", 2.0).unwrap();

        let a = inlet.pull_sample(Duration::from_millis(100)).unwrap().unwrap();
        let b = inlet.pull_sample(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!((a.payload.as_str(), a.timestamp), ("first", 1.0));
        assert_eq!((b.payload.as_str(), b.timestamp), ("second", 2.0));
        assert!(inlet.pull_sample(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn test_close_unsubscribes_once() {
        let bus = LoopbackBus::new();
        let outlet = bus.create_outlet(&markers("S")).unwrap();
        let stream = bus.resolve_by_name("S", Duration::ZERO).unwrap().remove(0);
        let mut inlet = bus.open_inlet(&stream).unwrap();
        assert!(outlet.has_consumers());
        assert_eq!(bus.connected_inlets("S"), 1);

        inlet.close();
        inlet.close();
        assert_eq!(bus.connected_inlets("S"), 0);
        assert!(inlet.pull_sample(Duration::ZERO).is_err());
    }

    #[test]
    fn test_wait_for_consumers() {
        let bus = LoopbackBus::new();
        let outlet = bus.create_outlet(&markers("S")).unwrap();
        assert!(!outlet.wait_for_consumers(Duration::from_millis(30)));

        let stream = bus.resolve_by_name("S", Duration::ZERO).unwrap().remove(0);
        let _inlet = bus.open_inlet(&stream).unwrap();
        let start = Instant::now();
        assert!(outlet.wait_for_consumers(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_dropping_outlet_delists_stream() {
        let bus = LoopbackBus::new();
        let outlet = bus.create_outlet(&markers("S")).unwrap();
        let stream = bus.resolve_by_name("S", Duration::ZERO).unwrap().remove(0);
        let mut inlet = bus.open_inlet(&stream).unwrap();

        drop(outlet);
        assert!(bus.resolve_all(Duration::ZERO).unwrap().is_empty());
        assert!(matches!(
            inlet.pull_sample(Duration::from_millis(10)),
            Err(ListenerError::Transport(_))
        ));
    }
}
