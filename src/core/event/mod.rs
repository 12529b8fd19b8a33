use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::core::phase::Phase;

static EVENT_COUNTER: AtomicU64 = AtomicU64::new(1); // global counter for unique event IDs

/// One phase transition, as published by the cycling loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub sequence: u64,      // unique across every light in the process
    pub phase: Phase,       // phase entered by this transition
    pub at_millis: u64,     // clock reading when it fired
    pub interval_secs: u64, // how long the previous phase was held
}

impl PhaseChange {
    fn next_id() -> u64 {
        EVENT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    pub fn new(phase: Phase, at: Duration, held_for: Duration) -> Self {
        Self {
            sequence: Self::next_id(),
            phase,
            at_millis: u64::try_from(at.as_millis()).unwrap_or(u64::MAX),
            interval_secs: held_for.as_secs(),
        }
    }
}
