use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct Signal {
    cancelled: Mutex<bool>,
    changed: Condvar,
}

/// Cancellation token shared by the phase cycle and its waiters.
///
/// Cloning yields a handle to the same token. Once cancelled it stays
/// cancelled.
#[derive(Clone)]
pub struct Shutdown {
    signal: Arc<Signal>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Signal {
                cancelled: Mutex::new(false),
                changed: Condvar::new(),
            }),
        }
    }

    /// Fire the token and wake everything parked in [`wait_timeout`](Self::wait_timeout)
    pub fn cancel(&self) {
        let mut cancelled = self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled = true;
        drop(cancelled);
        self.signal.changed.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Park for up to `timeout`. Returns `true` if the token was cancelled.
    ///
    /// A timeout too large to represent as a deadline parks until cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut cancelled = self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while !*cancelled {
            let Some(deadline) = deadline else {
                cancelled = self
                    .signal
                    .changed
                    .wait(cancelled)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .signal
                .changed
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            cancelled = guard;
        }
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
