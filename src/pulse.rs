use crate::cancel::{CancelToken, CANCEL_POLL};
use crate::transport::{Outlet, Publisher};
use crate::types::StreamDescriptor;
use crate::{ListenerError, Result};
use std::time::{Duration, Instant};

/// Marker sent when no payload is given, to check the pipeline end to end.
pub const TEST_MARKER: &str = "TEST_CONNECTION_SUCCESS";

#[derive(Debug, Clone)]
pub struct PulseConfig {
    pub stream: StreamDescriptor,
    /// Number of times the payload is pushed.
    pub count: u32,
    pub interval: Duration,
    /// Longest wait for a consumer before the first push, and how long the
    /// outlet stays up after the last one so listeners can drain.
    pub linger: Duration,
}

impl PulseConfig {
    /// A marker stream with a fresh random source id.
    pub fn new(stream_name: &str) -> Self {
        Self {
            stream: StreamDescriptor::markers(stream_name, &uuid::Uuid::new_v4().to_string()),
            count: 1,
            interval: Duration::from_secs(1),
            linger: Duration::from_secs(2),
        }
    }
}

/// Publish `payload` on a short-lived outlet. Returns how many pushes went out.
pub fn send_pulse<P: Publisher>(
    publisher: &P,
    config: &PulseConfig,
    payload: &str,
    cancel: &CancelToken,
) -> Result<u32> {
    let outlet = publisher.create_outlet(&config.stream)?;
    if !wait_for_consumer(&outlet, config.linger, cancel)? {
        log::warn!(
            "No consumer on '{}' after {:?}, pushing anyway",
            config.stream.name,
            config.linger
        );
    }

    let mut sent = 0;
    for i in 0..config.count {
        if i > 0 && cancel.sleep(config.interval) {
            break;
        }
        outlet.push(payload)?;
        sent += 1;
        log::info!("Pushed '{}' to '{}' ({}/{})", payload, config.stream.name, sent, config.count);
    }

    cancel.sleep(config.linger);
    Ok(sent)
}

/// Wait up to `timeout` for an inlet to connect, checking `cancel` between
/// short waits.
fn wait_for_consumer<O: Outlet>(
    outlet: &O,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(ListenerError::Interrupted);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        if outlet.wait_for_consumers(CANCEL_POLL.min(deadline - now)) {
            return Ok(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackBus;
    use crate::transport::{Discovery, Inlet};

    #[test]
    fn test_pulse_reaches_listener() {
        let bus = LoopbackBus::new();
        let mut config = PulseConfig::new("StealthGame_Events");
        config.count = 2;
        config.interval = Duration::from_millis(10);
        config.linger = Duration::from_millis(300);

        let publisher = bus.clone();
        let handle = std::thread::spawn(move || {
            send_pulse(&publisher, &config, TEST_MARKER, &CancelToken::new())
        });

        let stream = bus
            .resolve_by_name("StealthGame_Events", Duration::from_secs(5))
            .unwrap()
            .remove(0);
        let mut inlet = bus.open_inlet(&stream).unwrap();
        for _ in 0..2 {
            let sample = inlet.pull_sample(Duration::from_secs(5)).unwrap().unwrap();
            assert_eq!(sample.payload, TEST_MARKER);
        }
        assert_eq!(handle.join().unwrap().unwrap(), 2);
    }

    #[test]
    fn test_push_goes_out_once_consumer_connects() {
        let bus = LoopbackBus::new();
        let mut config = PulseConfig::new("StealthGame_Events");
        config.linger = Duration::from_secs(2);

        let start = Instant::now();
        let publisher = bus.clone();
        let handle = std::thread::spawn(move || {
            send_pulse(&publisher, &config, TEST_MARKER, &CancelToken::new())
        });

        let stream = bus
            .resolve_by_name("StealthGame_Events", Duration::from_secs(5))
            .unwrap()
            .remove(0);
        let mut inlet = bus.open_inlet(&stream).unwrap();
        let sample = inlet.pull_sample(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(sample.payload, TEST_MARKER);
        assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_no_consumer_still_pushes_after_linger() {
        let bus = LoopbackBus::new();
        let mut config = PulseConfig::new("S");
        config.linger = Duration::from_millis(60);

        let start = Instant::now();
        assert_eq!(send_pulse(&bus, &config, TEST_MARKER, &CancelToken::new()).unwrap(), 1);
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_cancel_before_push() {
        let bus = LoopbackBus::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = send_pulse(&bus, &PulseConfig::new("S"), TEST_MARKER, &cancel);
        assert!(matches!(result, Err(ListenerError::Interrupted)));
    }

    #[test]
    fn test_source_ids_are_unique() {
        let a = PulseConfig::new("S");
        let b = PulseConfig::new("S");
        assert_ne!(a.stream.source_id, b.stream.source_id);
        assert_eq!(a.stream.stream_type, "Markers");
        assert_eq!(a.stream.channel_count, 1);
    }
}
