//! `Coordinator`: the single-thread execution context that drives flow
//! actions for one actor (§4.5). Owns a FIFO action queue, a
//! time-ordered map of delayed actions, and a set of "watched"
//! disposables that keep the coordinator alive even once its queue
//! empties (e.g. a live subscription still waiting on upstream data).
//!
//! A `Coordinator` is exclusively owned by its scheduled actor, or by
//! a scoped block in tests (§3). It shares its time source with
//! whatever scheduler hosts it: production code wires it to a
//! [`SystemClock`](crate::scheduler::clock::SystemClock), tests wire it
//! to a [`LogicalClock`](crate::scheduler::clock::LogicalClock) the
//! test also drives directly with `advance`.

// Layer 1: Standard library imports
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::disposable::Disposable;
use crate::scheduler::clock::{Clock, SystemClock, Tick};

/// A unit of flow work. Receives the coordinator it runs on so it can
/// reschedule itself (e.g. a generator that produces one batch per
/// action, then re-queues to produce the next).
pub type Action = Box<dyn FnOnce(&Coordinator) + Send>;

struct Inner {
    queue: Mutex<VecDeque<Action>>,
    delayed: Mutex<BTreeMap<(Tick, u64), Action>>,
    watched: Mutex<Vec<Disposable>>,
    clock: Arc<dyn Clock>,
    seq: AtomicU64,
}

/// Cheaply-cloneable handle to one actor's flow execution context.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                delayed: Mutex::new(BTreeMap::new()),
                watched: Mutex::new(Vec::new()),
                clock,
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// A coordinator backed by real wall-clock time — what a
    /// production `ActorCell` hosts.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }

    /// Append `action` to the FIFO queue.
    pub fn schedule(&self, action: Action) {
        self.inner.queue.lock().push_back(action);
    }

    /// Insert `action` into the sorted delay map, due no sooner than
    /// `at`.
    pub fn delay_until(&self, at: Tick, action: Action) {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        self.inner.delayed.lock().insert((at, seq), action);
    }

    /// Convenience over `delay_until` relative to `steady_time()`.
    pub fn delay_for(&self, duration: Duration, action: Action) {
        let ticks = self.inner.clock.ticks_from(duration);
        let at = self.steady_time().advance(ticks);
        self.delay_until(at, action);
    }

    /// Extend this coordinator's lifetime until `disposable` reports
    /// disposed (§4.5) — used by subscriptions that must keep
    /// receiving `run()` attention even with an empty action queue.
    pub fn watch(&self, disposable: Disposable) {
        self.inner.watched.lock().push(disposable);
    }

    /// This coordinator's notion of the current time.
    pub fn steady_time(&self) -> Tick {
        self.inner.clock.now()
    }

    /// How many actions are queued (FIFO + due delayed), for test
    /// assertions and diagnostics.
    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().len() + self.inner.delayed.lock().len()
    }

    /// How many watched disposables are still live (not yet disposed).
    pub fn watched_len(&self) -> usize {
        self.prune_watched();
        self.inner.watched.lock().len()
    }

    fn prune_watched(&self) {
        self.inner.watched.lock().retain(|d| !d.is_disposed());
    }

    /// Pop the next action to run, preferring a delayed action whose
    /// time has come over the FIFO queue — both are "due" in the
    /// sense that nothing is gained by waiting, but a delayed action
    /// that has aged past its deadline takes precedence so timers
    /// stay prompt under load.
    fn pop_due(&self) -> Option<Action> {
        let now = self.steady_time();
        {
            let mut delayed = self.inner.delayed.lock();
            if let Some((&key, _)) = delayed.iter().next() {
                if key.0 <= now {
                    return delayed.remove(&key);
                }
            }
        }
        self.inner.queue.lock().pop_front()
    }

    /// Run at most `n` due actions (actions a delayed action schedules
    /// during this call count against the same budget). Returns how
    /// many actually ran.
    pub fn run_some(&self, n: usize) -> usize {
        let mut ran = 0;
        while ran < n {
            self.prune_watched();
            match self.pop_due() {
                Some(action) => {
                    action(self);
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Run due actions until `deadline` passes or none remain.
    pub fn run_until(&self, deadline: Instant) -> usize {
        let mut ran = 0;
        while Instant::now() < deadline {
            self.prune_watched();
            match self.pop_due() {
                Some(action) => {
                    action(self);
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Drain every currently-due action, including ones newly
    /// scheduled while draining, stopping once the queue is empty and
    /// no watched disposables remain (§4.5). A delayed action whose
    /// time has not yet come does not keep this loop running — time
    /// must advance (or a new enqueue must land) before a later call
    /// picks it up.
    pub fn run(&self) {
        loop {
            self.prune_watched();
            match self.pop_due() {
                Some(action) => action(self),
                None => break,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::flow::disposable::make_flag;
    use crate::scheduler::clock::LogicalClock;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn schedule_runs_fifo() {
        let coordinator = Coordinator::with_system_clock();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            coordinator.schedule(Box::new(move |_c| order.lock().push(i)));
        }
        coordinator.run();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn actions_can_reschedule_themselves() {
        let coordinator = Coordinator::with_system_clock();
        let count = Arc::new(AtomicUsize::new(0));
        fn tick(coordinator: &Coordinator, count: Arc<AtomicUsize>) {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 5 {
                let count = count.clone();
                coordinator.schedule(Box::new(move |c| tick(c, count)));
            }
        }
        let count_clone = count.clone();
        coordinator.schedule(Box::new(move |c| tick(c, count_clone)));
        coordinator.run();
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn delayed_action_waits_for_logical_clock() {
        let clock = Arc::new(LogicalClock::new());
        let coordinator = Coordinator::new(clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        coordinator.delay_for(
            Duration::from_millis(10),
            Box::new(move |_c| {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        coordinator.run();
        assert_eq!(fired.load(Ordering::SeqCst), 0, "not due yet");

        clock.advance(Duration::from_millis(10));
        coordinator.run();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn watched_disposable_keeps_len_nonzero_until_disposed() {
        let coordinator = Coordinator::with_system_clock();
        let d = make_flag();
        coordinator.watch(d.clone());
        assert_eq!(coordinator.watched_len(), 1);
        d.dispose();
        assert_eq!(coordinator.watched_len(), 0);
    }
}
