//! `TestScheduler`: the deterministic, single-threaded scheduler used
//! by the engine's own tests and available to user tests (§4.4).
//!
//! Grounded directly in CAF's `test_coordinator`/`test_actor_clock`
//! (`examples/original_source/libcaf_core/caf/detail/test_coordinator.cpp`,
//! `examples/original_source/cppa/detail/mock_scheduler.hpp`): a job
//! queue drained one resume step at a time under explicit control
//! (`run_once`, `run_once_lifo`, `run(n)`), and a logical clock that
//! only moves when `advance_time` says so.

// Layer 1: Standard library imports
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::clock::{Clock, LogicalClock};
use super::traits::{Action, Resumable, Scheduler, SpawnOptions};
use crate::actor::{Actor, ActorCell, ActorRef, ExitReason, ResumeOutcome, SpawnedActor};
use crate::broker::ActorRegistry;
use crate::monitoring::{Monitor, NoopMonitor, SchedulerEvent, SchedulerEventKind};

struct JobSlot {
    job: Mutex<Option<Box<dyn Resumable>>>,
}

struct ActionJob {
    action: Option<Action>,
}

impl Resumable for ActionJob {
    fn resume(&mut self, _budget: u32) -> ResumeOutcome {
        if let Some(action) = self.action.take() {
            action();
        }
        ResumeOutcome::Terminated(ExitReason::NORMAL)
    }
}

/// Whether, and how often, an enqueue immediately runs the job it just
/// admitted (CAF's `after_next_enqueue_` hook).
#[derive(Clone, Copy, PartialEq, Eq)]
enum InlineMode {
    None,
    Once,
    All,
}

/// A delayed action waiting for `advance_time`/`trigger_timeout` to
/// become due, keyed by `(deadline_nanos, insertion_order)` so ties
/// resolve FIFO.
struct Delayed {
    action: Action,
}

struct Inner<Mon: Monitor<SchedulerEvent>> {
    registry: ActorRegistry,
    jobs: Mutex<VecDeque<Arc<JobSlot>>>,
    clock: LogicalClock,
    delayed: Mutex<BTreeMap<(u64, u64), Delayed>>,
    next_delay_id: AtomicU64,
    inline_mode: Mutex<InlineMode>,
    monitor: Mon,
}

/// Single-threaded, fully deterministic. Nothing here spawns an OS
/// thread; a caller drives everything explicitly, which is what makes
/// tests built on it reproducible.
///
/// Held behind an `Arc` internally (not just at the handle level) so a
/// waker closure installed on a spawned actor's mailbox — which must
/// be `'static` — can clone its own reference to the ready queue
/// instead of borrowing `self`.
pub struct TestScheduler<Mon: Monitor<SchedulerEvent> = NoopMonitor<SchedulerEvent>> {
    inner: Arc<Inner<Mon>>,
}

impl TestScheduler<NoopMonitor<SchedulerEvent>> {
    /// A fresh scheduler with its own registry and no monitoring.
    pub fn new() -> Self {
        Self::with_monitor(ActorRegistry::new(), NoopMonitor::new())
    }
}

impl Default for TestScheduler<NoopMonitor<SchedulerEvent>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Mon: Monitor<SchedulerEvent> + 'static> TestScheduler<Mon> {
    pub fn with_monitor(registry: ActorRegistry, monitor: Mon) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                jobs: Mutex::new(VecDeque::new()),
                clock: LogicalClock::new(),
                delayed: Mutex::new(BTreeMap::new()),
                next_delay_id: AtomicU64::new(0),
                inline_mode: Mutex::new(InlineMode::None),
                monitor,
            }),
        }
    }

    /// How many jobs are currently ready to run.
    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.lock().len()
    }

    /// Whether any delayed action is still waiting to become due.
    pub fn has_pending_timeout(&self) -> bool {
        !self.inner.delayed.lock().is_empty()
    }

    fn push_ready(&self, slot: Arc<JobSlot>) {
        Self::push_ready_on(&self.inner, slot);
        let mode = *self.inner.inline_mode.lock();
        match mode {
            InlineMode::Once => {
                *self.inner.inline_mode.lock() = InlineMode::None;
                self.run_once_lifo();
            }
            InlineMode::All => {
                self.run_once_lifo();
            }
            InlineMode::None => {}
        }
    }

    fn push_ready_on(inner: &Inner<Mon>, slot: Arc<JobSlot>) {
        inner.jobs.lock().push_back(slot);
    }

    fn run_job(&self, slot: Arc<JobSlot>) {
        let mut job = match slot.job.lock().take() {
            Some(job) => job,
            None => return,
        };
        let outcome = job.resume(1);
        let _ = self.inner.monitor.record(SchedulerEvent {
            timestamp: chrono::Utc::now(),
            actor_id: None,
            event_kind: SchedulerEventKind::ActorResumed { processed: 1 },
            metadata: std::collections::HashMap::new(),
        });
        match outcome {
            ResumeOutcome::BudgetExhausted => {
                *slot.job.lock() = Some(job);
                self.inner.jobs.lock().push_front(slot);
            }
            ResumeOutcome::AwaitingMessages => {
                *slot.job.lock() = Some(job);
                let _ = self.inner.monitor.record(SchedulerEvent {
                    timestamp: chrono::Utc::now(),
                    actor_id: None,
                    event_kind: SchedulerEventKind::ActorSuspended,
                    metadata: std::collections::HashMap::new(),
                });
            }
            ResumeOutcome::Terminated(reason) => {
                let _ = self.inner.monitor.record(SchedulerEvent {
                    timestamp: chrono::Utc::now(),
                    actor_id: None,
                    event_kind: SchedulerEventKind::ActorTerminated {
                        reason_code: reason.code(),
                    },
                    metadata: std::collections::HashMap::new(),
                });
            }
        }
    }

    /// Run the front of the ready queue, resuming it with a budget of
    /// one message. Returns whether a job actually ran.
    pub fn run_once(&self) -> bool {
        let slot = self.inner.jobs.lock().pop_front();
        match slot {
            Some(slot) => {
                self.run_job(slot);
                true
            }
            None => false,
        }
    }

    /// Like [`run_once`](Self::run_once) but takes the most recently
    /// enqueued job instead of the oldest one.
    pub fn run_once_lifo(&self) -> bool {
        let slot = self.inner.jobs.lock().pop_back();
        match slot {
            Some(slot) => {
                self.run_job(slot);
                true
            }
            None => false,
        }
    }

    /// Run up to `max_count` ready jobs (FIFO), stopping early if the
    /// queue empties. Returns the number actually run.
    pub fn run(&self, max_count: usize) -> usize {
        let mut ran = 0;
        while ran < max_count && self.run_once() {
            ran += 1;
        }
        ran
    }

    /// The scheduler's logical clock, shared with `Coordinator::steady_time`.
    pub fn clock(&self) -> &LogicalClock {
        &self.inner.clock
    }

    /// Move the logical clock forward by `duration` and run every
    /// delayed action whose deadline is now due, in deadline order.
    /// Returns how many fired.
    pub fn advance_time(&self, duration: Duration) -> usize {
        let now = self.inner.clock.advance(duration).as_nanos();
        self.fire_due(now)
    }

    fn fire_due(&self, up_to_nanos: u64) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let delayed = self.inner.delayed.lock();
                delayed
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= up_to_nanos)
            };
            let Some(key) = next else {
                break;
            };
            let entry = self.inner.delayed.lock().remove(&key);
            if let Some(entry) = entry {
                (entry.action)();
                fired += 1;
            }
        }
        fired
    }

    /// Force the single earliest-deadline delayed action to fire,
    /// advancing the clock to its deadline if that deadline is still
    /// in the future. Returns whether anything fired.
    pub fn trigger_timeout(&self) -> bool {
        let earliest = self.inner.delayed.lock().keys().next().copied();
        match earliest {
            Some((deadline, _)) => {
                if deadline > self.inner.clock.now().as_nanos() {
                    let delta = deadline - self.inner.clock.now().as_nanos();
                    self.inner.clock.advance(Duration::from_nanos(delta));
                }
                self.fire_due(self.inner.clock.now().as_nanos()) > 0
            }
            None => false,
        }
    }

    /// Repeatedly [`trigger_timeout`](Self::trigger_timeout) until
    /// nothing is left pending. Returns how many fired.
    pub fn trigger_timeouts(&self) -> usize {
        let mut fired = 0;
        while self.trigger_timeout() {
            fired += 1;
        }
        fired
    }

    /// Arm the next enqueue (spawn, `schedule_action`, or a
    /// ready-again actor) to run immediately via
    /// [`run_once_lifo`](Self::run_once_lifo), exactly once.
    pub fn inline_next_enqueue(&self) {
        *self.inner.inline_mode.lock() = InlineMode::Once;
    }

    /// Like [`inline_next_enqueue`](Self::inline_next_enqueue) but
    /// stays armed for every subsequent enqueue until the scheduler is
    /// dropped or re-armed.
    pub fn inline_all_enqueues(&self) {
        *self.inner.inline_mode.lock() = InlineMode::All;
    }
}

impl<Mon: Monitor<SchedulerEvent> + 'static> Scheduler for TestScheduler<Mon> {
    fn spawn<A: Actor>(&self, actor: A, options: SpawnOptions) -> ActorRef<A::Message> {
        let SpawnedActor {
            mut cell,
            actor_ref,
            state,
        } = ActorCell::spawn(actor, options.address(), self.inner.registry.clone());
        let actor_ref = actor_ref.with_priority_aware(options.is_priority_aware());

        // §6: link/monitor land before the actor's job slot ever enters
        // the ready queue, matching `PoolScheduler::spawn` — no run_once
        // can observe the actor without its relationships already wired.
        if let Some(peer) = options.link_target() {
            self.inner.registry.link(actor_ref.id(), peer);
        }
        if let Some(observer) = options.monitor_observer() {
            self.inner.registry.monitor(observer, actor_ref.id());
        }
        // `detached`/`blocking_api` have no effect here: `TestScheduler`
        // is single-threaded by construction, so there is no separate
        // worker pool to bypass.

        let slot = Arc::new(JobSlot {
            job: Mutex::new(None),
        });
        let inner_for_waker = Arc::clone(&self.inner);
        let slot_for_waker = Arc::clone(&slot);
        let state_for_waker = state.clone();
        cell.set_waker(Arc::new(move || {
            if state_for_waker.wake_if_blocked() {
                Self::push_ready_on(&inner_for_waker, Arc::clone(&slot_for_waker));
            }
        }));

        *slot.job.lock() = Some(Box::new(cell));
        self.push_ready(slot);

        actor_ref
    }

    fn schedule_action(&self, action: Action) {
        let slot = Arc::new(JobSlot {
            job: Mutex::new(Some(Box::new(ActionJob {
                action: Some(action),
            }) as Box<dyn Resumable>)),
        });
        self.push_ready(slot);
    }

    fn delay_action(&self, action: Action, delay: Duration) {
        let deadline = self
            .inner
            .clock
            .now()
            .advance(self.inner.clock.ticks_from(delay))
            .as_nanos();
        let id = self.inner.next_delay_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .delayed
            .lock()
            .insert((deadline, id), Delayed { action });
    }

    fn start(&self) {
        // Nothing to start: there are no worker threads. Present for
        // `Scheduler` parity with `PoolScheduler`.
    }

    fn stop(&self) {
        loop {
            let ran = self.run(usize::MAX);
            let fired = self.trigger_timeouts();
            if ran == 0 && fired == 0 {
                break;
            }
        }
    }

    fn registry(&self) -> &ActorRegistry {
        &self.inner.registry
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Behavior};
    use crate::message::Message;
    use std::cell::RefCell;
    use std::fmt;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Counter {
        Increment,
        Quit,
    }

    impl Message for Counter {
        const MESSAGE_TYPE: &'static str = "counter";
    }

    #[derive(Debug)]
    struct CounterError;

    impl fmt::Display for CounterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "counter error")
        }
    }

    impl std::error::Error for CounterError {}

    struct CounterActor {
        count: u64,
    }

    impl Actor for CounterActor {
        type Message = Counter;
        type Error = CounterError;

        fn initial_behavior() -> Behavior<Self> {
            Behavior::new().on(|actor: &mut CounterActor, msg, ctx| match msg {
                Counter::Increment => {
                    actor.count += 1;
                    Some(Ok(()))
                }
                Counter::Quit => {
                    ctx.quit(ExitReason::NORMAL);
                    Some(Ok(()))
                }
            })
        }
    }

    #[test]
    fn run_drains_a_spawned_actor() {
        let scheduler = TestScheduler::new();
        let actor_ref = scheduler.spawn(CounterActor { count: 0 }, SpawnOptions::new());
        actor_ref.tell(Counter::Increment);
        actor_ref.tell(Counter::Increment);
        actor_ref.tell(Counter::Quit);

        let ran = scheduler.run(10);
        assert!(ran > 0);
        assert_eq!(scheduler.pending_jobs(), 0);
    }

    #[test]
    fn schedule_action_runs_fifo_with_actors() {
        let scheduler = TestScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_a = log.clone();
        scheduler.schedule_action(Box::new(move || log_a.borrow_mut().push("a")));
        let log_b = log.clone();
        scheduler.schedule_action(Box::new(move || log_b.borrow_mut().push("b")));

        scheduler.run(10);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn delay_action_fires_on_advance_time() {
        let scheduler = TestScheduler::new();
        let fired = Rc::new(RefCell::new(false));
        let fired_clone = fired.clone();

        scheduler.delay_action(
            Box::new(move || *fired_clone.borrow_mut() = true),
            Duration::from_millis(100),
        );

        assert!(!*fired.borrow());
        scheduler.advance_time(Duration::from_millis(50));
        assert!(!*fired.borrow());
        scheduler.advance_time(Duration::from_millis(50));
        assert!(*fired.borrow());
    }

    #[test]
    fn trigger_timeout_forces_the_earliest_delay() {
        let scheduler = TestScheduler::new();
        let fired = Rc::new(RefCell::new(false));
        let fired_clone = fired.clone();

        scheduler.delay_action(
            Box::new(move || *fired_clone.borrow_mut() = true),
            Duration::from_secs(1000),
        );

        assert!(scheduler.trigger_timeout());
        assert!(*fired.borrow());
        assert!(!scheduler.trigger_timeout());
    }

    #[test]
    fn inline_next_enqueue_runs_immediately() {
        let scheduler = TestScheduler::new();
        let ran = Rc::new(RefCell::new(false));
        let ran_clone = ran.clone();

        scheduler.inline_next_enqueue();
        scheduler.schedule_action(Box::new(move || *ran_clone.borrow_mut() = true));

        assert!(*ran.borrow());
        assert_eq!(scheduler.pending_jobs(), 0);
    }
}
