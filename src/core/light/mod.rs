use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

pub use crate::core::{
    clock::{Clock, ManualClock, SystemClock},
    config::LightConfig,
    error::{LightError, QueueError},
    event::PhaseChange,
    log::{append_logs, SafeTransitionLog, TransitionLog},
    phase::{AtomicPhase, IntervalSampler, Phase, PhaseCycle},
    queue::{MessageQueue, SafeQueue},
    shutdown::Shutdown,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State reachable from both the light and its cycle thread
struct Shared<C> {
    phase: AtomicPhase,
    queue: SafeQueue<Phase>,
    subscribers: Mutex<Vec<Weak<MessageQueue<Phase>>>>,
    log: SafeTransitionLog,
    shutdown: Shutdown,
    clock: Arc<C>,
}

impl<C: Clock> Shared<C> {
    /// Make a transition visible: phase cell first, then the queues
    fn publish(&self, phase: Phase, now: Duration, held_for: Duration) {
        self.phase.store(phase);

        let change = PhaseChange::new(phase, now, held_for);
        debug!(
            %phase,
            sequence = change.sequence,
            interval_secs = held_for.as_secs(),
            "phase changed"
        );
        lock(&self.log).record(change);

        // Subscribers first: once a shared-queue waiter sees this phase,
        // a new subscription only receives later transitions.
        lock(&self.subscribers).retain(|subscriber| match subscriber.upgrade() {
            Some(queue) => queue.send(phase).is_ok(),
            None => false,
        });

        if self.queue.send(phase).is_err() {
            trace!(%phase, "shared queue closed, notification dropped");
        }
    }

    /// Cancel the cycle and close every queue so blocked waiters return
    fn close(&self) {
        self.shutdown.cancel();
        self.queue.close();
        for subscriber in lock(&self.subscribers).drain(..) {
            if let Some(queue) = subscriber.upgrade() {
                queue.close();
            }
        }
    }
}

/// Closes the light when the cycle thread exits, whether it returns or unwinds
struct CycleGuard<C: Clock> {
    shared: Arc<Shared<C>>,
}

impl<C: Clock> Drop for CycleGuard<C> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("phase cycle panicked, releasing waiters");
        }
        self.shared.close();
    }
}

/// Background loop: sleep until the current phase expires, flip it, publish.
fn cycle_through_phases<C: Clock>(shared: Arc<Shared<C>>, mut cycle: PhaseCycle, mut sampler: IntervalSampler) {
    let _guard = CycleGuard { shared: Arc::clone(&shared) };
    info!(interval_secs = cycle.interval().as_secs(), "phase cycle started");
    loop {
        if !shared.clock.sleep_until(cycle.deadline(), &shared.shutdown) {
            break;
        }
        let now = shared.clock.now();
        let held_for = cycle.interval();
        if let Some(phase) = cycle.poll(now, || sampler.sample()) {
            shared.publish(phase, now, held_for);
        }
    }
    info!(transitions = cycle.transitions(), "phase cycle stopped");
}

/// A single traffic light.
///
/// The light starts red. [`simulate`](Self::simulate) runs the phase cycle
/// on a background thread; [`wait_for_green`](Self::wait_for_green) blocks
/// the caller until the cycle publishes a green phase.
///
/// All waiters calling `wait_for_green` share one queue, so each published
/// phase is consumed by exactly one of them. Observers that must see every
/// transition should [`subscribe`](Self::subscribe) instead.
pub struct TrafficLight<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
    config: LightConfig,
    started: AtomicBool,
    cycle: Mutex<Option<JoinHandle<()>>>,
}

impl TrafficLight<SystemClock> {
    /// Create a red light with the default 4-6 second timing
    pub fn new() -> Self {
        Self::build(LightConfig::default(), Arc::new(SystemClock::new()))
    }

    pub fn with_config(config: LightConfig) -> Result<Self, LightError> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }
}

impl Default for TrafficLight<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TrafficLight<C> {
    /// Create a red light driven by `clock`
    pub fn with_clock(config: LightConfig, clock: Arc<C>) -> Result<Self, LightError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: LightConfig, clock: Arc<C>) -> Self {
        Self {
            shared: Arc::new(Shared {
                phase: AtomicPhase::new(Phase::Red),
                queue: Arc::new(MessageQueue::new()),
                subscribers: Mutex::new(Vec::new()),
                log: Arc::new(Mutex::new(TransitionLog::with_limit(config.history_limit))),
                shutdown: Shutdown::new(),
                clock,
            }),
            config,
            started: AtomicBool::new(false),
            cycle: Mutex::new(None),
        }
    }

    pub fn current_phase(&self) -> Phase {
        self.shared.phase.load()
    }

    pub fn config(&self) -> &LightConfig {
        &self.config
    }

    pub fn is_simulating(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.shared.shutdown.is_cancelled()
    }

    /// Start the phase cycle on a background thread and return immediately.
    ///
    /// The cycle may only be started once per light; a second call fails
    /// with [`LightError::AlreadySimulating`].
    pub fn simulate(&self) -> Result<(), LightError> {
        if self.shared.shutdown.is_cancelled() {
            return Err(LightError::ShutDown);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("simulate called on a light that is already cycling");
            return Err(LightError::AlreadySimulating);
        }

        // The first deadline is fixed here so time advanced right after
        // this call already counts towards the first phase.
        let mut sampler = self.config.sampler();
        let cycle = PhaseCycle::new(self.shared.clock.now(), sampler.sample());

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("traffic-light-cycle".into())
            .spawn(move || cycle_through_phases(shared, cycle, sampler))
            .map_err(|err| {
                self.started.store(false, Ordering::Release);
                LightError::Spawn(err)
            })?;
        *lock(&self.cycle) = Some(handle);
        info!(
            min_interval_secs = self.config.min_interval_secs,
            max_interval_secs = self.config.max_interval_secs,
            "traffic light simulating"
        );
        Ok(())
    }

    /// Block until the shared queue yields a green phase.
    ///
    /// Red notifications pulled on the way are discarded. Returns
    /// [`LightError::ShutDown`] once the light is shut down.
    pub fn wait_for_green(&self) -> Result<(), LightError> {
        loop {
            let phase = self.shared.queue.receive()?;
            if phase.is_green() {
                return Ok(());
            }
            trace!(%phase, "discarding phase while waiting for green");
        }
    }

    /// Like [`wait_for_green`](Self::wait_for_green), failing with
    /// [`LightError::Timeout`] if no green arrives within `timeout`.
    pub fn wait_for_green_timeout(&self, timeout: Duration) -> Result<(), LightError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait_for_green();
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let phase = self.shared.queue.receive_timeout(remaining)?;
            if phase.is_green() {
                return Ok(());
            }
            trace!(%phase, "discarding phase while waiting for green");
        }
    }

    /// Register an observer that receives every transition published from now on
    pub fn subscribe(&self) -> PhaseSubscription {
        let queue = Arc::new(MessageQueue::new());
        let mut subscribers = lock(&self.shared.subscribers);
        if self.shared.shutdown.is_cancelled() {
            queue.close();
        } else {
            subscribers.push(Arc::downgrade(&queue));
        }
        PhaseSubscription { queue }
    }

    /// Phase notifications not yet consumed from the shared queue
    pub fn pending_notifications(&self) -> usize {
        self.shared.queue.len()
    }

    /// Transition history, oldest first; capped by `history_limit`
    pub fn transitions(&self) -> Vec<PhaseChange> {
        lock(&self.shared.log).entries().copied().collect()
    }

    /// Every transition since `simulate`, including ones dropped from the history
    pub fn transition_count(&self) -> u64 {
        lock(&self.shared.log).recorded()
    }

    /// Append the transition history to `path` as NDJSON
    pub fn dump_transitions(&self, path: impl AsRef<Path>) -> Result<(), LightError> {
        let entries = self.transitions();
        append_logs(&entries, path)
    }

    /// Stop the cycle, release every waiter and join the cycle thread.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.is_cancelled() {
            info!(transitions = self.transition_count(), "shutting down traffic light");
        }
        self.shared.close();
        let handle = lock(&self.cycle).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("phase cycle thread panicked");
            }
        }
    }
}

impl<C: Clock> Drop for TrafficLight<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Private feed of every transition published after [`TrafficLight::subscribe`]
pub struct PhaseSubscription {
    queue: Arc<MessageQueue<Phase>>,
}

impl PhaseSubscription {
    /// Block until the next transition
    pub fn next_phase(&self) -> Result<Phase, LightError> {
        Ok(self.queue.receive()?)
    }

    pub fn next_phase_timeout(&self, timeout: Duration) -> Result<Phase, LightError> {
        Ok(self.queue.receive_timeout(timeout)?)
    }

    pub fn try_next(&self) -> Option<Phase> {
        self.queue.try_receive()
    }

    /// Block until this subscription sees a green phase
    pub fn wait_for_green(&self) -> Result<(), LightError> {
        while !self.next_phase()?.is_green() {}
        Ok(())
    }

    /// Transitions received but not yet consumed
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
