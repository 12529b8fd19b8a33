use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::core::error::QueueError;

/// Which end of the buffer `receive` takes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryOrder {
    /// Oldest value first
    #[default]
    Fifo,
    /// Most recently sent value first. Older values wait until the
    /// queue drains, so a slow consumer may never see them.
    Lifo,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Thread-safe handoff queue with blocking receive and notifying send
pub struct MessageQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    order: DeliveryOrder,
}

impl<T> MessageQueue<T> {
    /// Create a new, empty FIFO queue
    pub fn new() -> Self {
        Self::with_order(DeliveryOrder::Fifo)
    }

    pub fn with_order(order: DeliveryOrder) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
            order,
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take(&self, state: &mut QueueState<T>) -> Option<T> {
        let len_before = state.items.len();
        let result = match self.order {
            DeliveryOrder::Fifo => state.items.pop_front(),
            DeliveryOrder::Lifo => state.items.pop_back(),
        };
        // -- post op assertion: queue size decreases if a value was taken
        if result.is_some() {
            debug_assert_eq!(state.items.len(), len_before - 1, "Queue length should decrease by 1");
        }
        result
    }

    /// Append a value and wake one blocked receiver.
    ///
    /// Never blocks: the queue is unbounded. Fails only once the queue is closed.
    pub fn send(&self, value: T) -> Result<(), QueueError> {
        let mut state = self.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.items.push_back(value);
        let pending = state.items.len();
        drop(state);
        self.available.notify_one();
        trace!(pending, "message sent");
        Ok(())
    }

    /// Block until a value is available and take it.
    ///
    /// Values still buffered when the queue is closed are handed out first;
    /// after that every call returns [`QueueError::Closed`].
    pub fn receive(&self) -> Result<T, QueueError> {
        let mut state = self.lock();
        loop {
            if let Some(value) = self.take(&mut state) {
                trace!(pending = state.items.len(), "message received");
                return Ok(value);
            }
            if state.closed {
                return Err(QueueError::Closed);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like [`receive`](Self::receive), giving up after `timeout`.
    ///
    /// A timeout too large to represent as a deadline waits without one.
    pub fn receive_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.receive();
        };
        let mut state = self.lock();
        loop {
            if let Some(value) = self.take(&mut state) {
                return Ok(value);
            }
            if state.closed {
                return Err(QueueError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::Timeout);
            }
            let (guard, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    /// Take a value if one is buffered, without blocking
    pub fn try_receive(&self) -> Option<T> {
        let mut state = self.lock();
        self.take(&mut state)
    }

    /// Reject further sends and wake every blocked receiver
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Get the current queue length
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn order(&self) -> DeliveryOrder {
        self.order
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue shared between producer and consumer threads
pub type SafeQueue<T> = Arc<MessageQueue<T>>;
