use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::core::shutdown::Shutdown;

/// Monotonic time source used by the phase cycle.
///
/// Readings are offsets from an arbitrary origin fixed when the clock is created.
pub trait Clock: Send + Sync + 'static {
    /// Current reading
    fn now(&self) -> Duration;

    /// Block until `now() >= deadline` or `shutdown` fires.
    ///
    /// Returns `true` when the deadline was reached and `false` on shutdown.
    fn sleep_until(&self, deadline: Duration, shutdown: &Shutdown) -> bool;
}

/// Wall time, measured with [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration, shutdown: &Shutdown) -> bool {
        loop {
            let now = self.now();
            if now >= deadline {
                return true;
            }
            if shutdown.wait_timeout(deadline - now) {
                return false;
            }
        }
    }
}

// How often a manual-clock sleeper rechecks the shutdown token.
const CANCEL_CHECK: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleepers: usize,
}

/// Virtual clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    changed: Condvar,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, ready to hand to a traffic light
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move time forward and wake every sleeper whose deadline passed
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(by);
        drop(state);
        self.changed.notify_all();
    }

    /// Number of threads currently parked in `sleep_until`
    pub fn sleepers(&self) -> usize {
        self.lock().sleepers
    }

    /// Wait (in real time) until at least `count` threads are parked.
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub fn wait_for_sleepers(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        while state.sleepers < count {
            let Some(deadline) = deadline else {
                state = self
                    .changed
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
        true
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.lock().now
    }

    fn sleep_until(&self, deadline: Duration, shutdown: &Shutdown) -> bool {
        let mut state = self.lock();
        state.sleepers += 1;
        self.changed.notify_all();
        let reached = loop {
            if state.now >= deadline {
                break true;
            }
            if shutdown.is_cancelled() {
                break false;
            }
            let (guard, _) = self
                .changed
                .wait_timeout(state, CANCEL_CHECK)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        };
        state.sleepers -= 1;
        reached
    }
}
