use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::core::config::LightConfig;
use crate::core::error::LightError;

/// Signal shown by the traffic light
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Red,
    Green,
}

impl Phase {
    /// The phase that follows this one
    pub fn toggled(self) -> Phase {
        match self {
            Phase::Red => Phase::Green,
            Phase::Green => Phase::Red,
        }
    }

    pub fn is_green(self) -> bool {
        self == Phase::Green
    }

    fn to_bits(self) -> u8 {
        match self {
            Phase::Red => 0,
            Phase::Green => 1,
        }
    }

    fn from_bits(bits: u8) -> Phase {
        if bits == 0 { Phase::Red } else { Phase::Green }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Red => f.write_str("red"),
            Phase::Green => f.write_str("green"),
        }
    }
}

/// Phase cell written by the cycle thread and read from anywhere
#[derive(Debug)]
pub struct AtomicPhase(AtomicU8);

impl AtomicPhase {
    pub fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase.to_bits()))
    }

    pub fn load(&self) -> Phase {
        Phase::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, phase: Phase) {
        self.0.store(phase.to_bits(), Ordering::Release);
    }
}

impl Default for AtomicPhase {
    fn default() -> Self {
        Self::new(Phase::default())
    }
}

/// Draws phase durations uniformly from whole seconds in `[min, max]`
#[derive(Debug, Clone)]
pub struct IntervalSampler {
    rng: StdRng,
    min_secs: u64,
    max_secs: u64,
}

impl IntervalSampler {
    /// Sampler for the bounds and seed of `config`, rejecting invalid bounds
    pub fn from_config(config: &LightConfig) -> Result<Self, LightError> {
        config.validate()?;
        Ok(config.sampler())
    }

    pub(crate) fn new(min_secs: u64, max_secs: u64, seed: Option<u64>) -> Self {
        assert!(min_secs <= max_secs, "interval lower bound must not exceed upper bound");
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, min_secs, max_secs }
    }

    pub fn sample(&mut self) -> Duration {
        Duration::from_secs(self.rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// Pure phase state machine, driven by clock readings.
///
/// Times are offsets on a monotonic clock. A transition fires once
/// `now - last_transition >= interval`; the interval is resampled after
/// every transition.
#[derive(Debug, Clone)]
pub struct PhaseCycle {
    phase: Phase,
    last_transition: Duration,
    interval: Duration,
    transitions: u64,
}

impl PhaseCycle {
    /// Start in red at `start`, with the first phase lasting `interval`
    pub fn new(start: Duration, interval: Duration) -> Self {
        Self {
            phase: Phase::Red,
            last_transition: start,
            interval,
            transitions: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Clock reading at which the next transition is due
    pub fn deadline(&self) -> Duration {
        self.last_transition.saturating_add(self.interval)
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_transition)
    }

    /// Flip the phase if the current interval has elapsed.
    ///
    /// Returns the new phase when a transition fired. `next_interval` is
    /// only consulted after a transition.
    pub fn poll(&mut self, now: Duration, next_interval: impl FnOnce() -> Duration) -> Option<Phase> {
        if self.elapsed(now) < self.interval {
            return None;
        }
        let before = self.phase;
        self.phase = before.toggled();
        self.last_transition = now;
        self.interval = next_interval();
        self.transitions += 1;
        // --post operation assertion: phases strictly alternate
        debug_assert_ne!(before, self.phase, "Phase must change on every transition");
        Some(self.phase)
    }
}
