use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of interruptible waits.
pub const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Shared stop flag set by the operator interrupt and polled by the
/// locator and logger loops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that is cancelled when the process receives Ctrl+C, SIGTERM or SIGHUP.
    pub fn from_ctrlc() -> crate::Result<Self> {
        let token = Self::new();
        let handler_token = token.clone();
        ctrlc::set_handler(move || {
            log::debug!("Interrupt received");
            handler_token.cancel();
        })
        .map_err(|e| {
            crate::ListenerError::Config(format!("Failed to install Ctrl+C handler: {}", e))
        })?;
        Ok(token)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on cancellation.
    /// Returns `true` if the token was cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(CANCEL_POLL.min(deadline - now));
        }
    }
}
