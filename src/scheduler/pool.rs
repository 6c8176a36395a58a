//! `PoolScheduler`: the production, work-sharing thread pool (§4.4).
//!
//! Every ready unit of work — a freshly spawned actor, an actor
//! re-queued after [`ResumeOutcome::BudgetExhausted`], or a plain
//! [`Action`] — sits in one shared [`VecDeque`] guarded by a single
//! `Mutex`/`Condvar` pair. Any idle worker may pop the front of that
//! queue and run it; there is no per-worker queue and no stealing,
//! matching §4.4's "work-sharing, not work-stealing" fairness rule.
//!
//! A blocked actor is not in the ready queue at all — its `ActorCell`
//! sits inside the [`JobSlot`] its waker closure closes over, and the
//! waker is the only thing that can put it back (§4.1's suspension
//! protocol).

// Layer 1: Standard library imports
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};

// Layer 3: Internal module imports
use super::traits::{Action, Resumable, Scheduler, SpawnOptions};
use crate::actor::{Actor, ActorCell, ActorRef, ExitReason, ResumeOutcome, SharedActorState, SpawnedActor};
use crate::broker::ActorRegistry;
use crate::monitoring::{Monitor, NoopMonitor, SchedulerEvent, SchedulerEventKind};
use crate::system::config::SchedulerConfig;

/// Default per-lease message budget (§4.4 deliberately leaves this
/// implementation-defined; see `DESIGN.md`).
pub const DEFAULT_RESUME_BUDGET: u32 = 32;

/// Home for a unit of work that is either sitting in the ready queue
/// or checked out by a worker thread. Stays alive (via `Arc`) for as
/// long as a waker closure might still need to push it back.
struct JobSlot {
    job: Mutex<Option<Box<dyn Resumable>>>,
}

/// A plain closure dressed up as a one-shot [`Resumable`] so it can
/// share the ready queue with actor resume steps.
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

/// The shared ready queue plus its wake condition. Cloned (via `Arc`)
/// into every waker closure so a blocked actor's mailbox can hand it
/// straight back to a worker.
struct ReadyQueue {
    jobs: Mutex<VecDeque<Arc<JobSlot>>>,
    condvar: Condvar,
}

impl ReadyQueue {
    fn push(&self, slot: Arc<JobSlot>) {
        self.jobs.lock().push_back(slot);
        self.condvar.notify_one();
    }
}

/// A deadline-ordered queue of delayed actions, serviced by one
/// dedicated timer thread (§4.4's `delay_action`).
struct TimerHeap {
    next_id: u64,
    due: BinaryHeap<Reverse<(Instant, u64)>>,
    pending: std::collections::HashMap<u64, Action>,
}

impl TimerHeap {
    fn new() -> Self {
        Self {
            next_id: 0,
            due: BinaryHeap::new(),
            pending: std::collections::HashMap::new(),
        }
    }
}

struct Timer {
    heap: Mutex<TimerHeap>,
    condvar: Condvar,
}

impl Timer {
    fn new() -> Self {
        Self {
            heap: Mutex::new(TimerHeap::new()),
            condvar: Condvar::new(),
        }
    }

    fn schedule(&self, action: Action, delay: Duration) {
        let mut heap = self.heap.lock();
        let id = heap.next_id;
        heap.next_id += 1;
        let deadline = Instant::now() + delay;
        heap.due.push(Reverse((deadline, id)));
        heap.pending.insert(id, action);
        drop(heap);
        self.condvar.notify_one();
    }
}

struct Inner<Mon: Monitor<SchedulerEvent>> {
    registry: ActorRegistry,
    queue: ReadyQueue,
    timer: Timer,
    shutdown: AtomicBool,
    worker_count: usize,
    resume_budget: u32,
    monitor: Mon,
    workers: Mutex<Vec<JoinHandle<()>>>,
    timer_thread: Mutex<Option<JoinHandle<()>>>,
}

/// The fixed-size, work-sharing thread pool described by §4.4. Each
/// worker loops: pop the ready queue (blocking on the condvar when
/// empty), resume the job with [`DEFAULT_RESUME_BUDGET`], and act on
/// the outcome.
///
/// Generic over the monitor so production deployments pay nothing for
/// observability they don't use ([`NoopMonitor`] is the default) while
/// tests can plug in an [`crate::monitoring::InMemoryMonitor`].
pub struct PoolScheduler<Mon: Monitor<SchedulerEvent> = NoopMonitor<SchedulerEvent>> {
    inner: Arc<Inner<Mon>>,
}

impl PoolScheduler<NoopMonitor<SchedulerEvent>> {
    /// A pool sized from `config` (§2.3's `scheduler.max_threads`,
    /// `0` meaning "host core count, lower-bounded at 1"), with a
    /// fresh registry and no monitoring.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self::with_monitor(config, ActorRegistry::new(), NoopMonitor::new())
    }
}

impl<Mon: Monitor<SchedulerEvent> + 'static> PoolScheduler<Mon> {
    /// Build a pool against an existing registry and monitor, without
    /// starting its workers — call [`Scheduler::start`] when ready.
    pub fn with_monitor(config: &SchedulerConfig, registry: ActorRegistry, monitor: Mon) -> Self {
        let worker_count = config.resolved_max_threads().max(1);
        let inner = Arc::new(Inner {
            registry,
            queue: ReadyQueue {
                jobs: Mutex::new(VecDeque::new()),
                condvar: Condvar::new(),
            },
            timer: Timer::new(),
            shutdown: AtomicBool::new(false),
            worker_count,
            resume_budget: DEFAULT_RESUME_BUDGET,
            monitor,
            workers: Mutex::new(Vec::new()),
            timer_thread: Mutex::new(None),
        });
        Self { inner }
    }

    fn push_new_job(&self, job: Box<dyn Resumable>) {
        let slot = Arc::new(JobSlot {
            job: Mutex::new(Some(job)),
        });
        self.inner.queue.push(slot);
    }

    /// `detached` spawn (§6): give `cell` its own OS thread instead of
    /// a slot in the shared work-sharing pool, so a `blocking_api`
    /// actor's blocking receive calls can never starve the pool (§9).
    /// The thread parks on its own condvar rather than the pool's
    /// ready queue — `AwaitingMessages` here never re-enters
    /// `Inner::queue`.
    fn spawn_detached<A: Actor>(&self, mut cell: ActorCell<A>, _state: SharedActorState) {
        let parked = Arc::new((Mutex::new(()), Condvar::new()));
        let parked_for_waker = Arc::clone(&parked);
        cell.set_waker(Arc::new(move || {
            let _guard = parked_for_waker.0.lock();
            parked_for_waker.1.notify_one();
        }));

        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || loop {
            let outcome = cell.resume(u32::MAX);
            let _ = inner.monitor.record(SchedulerEvent {
                timestamp: chrono::Utc::now(),
                actor_id: None,
                event_kind: SchedulerEventKind::ActorResumed { processed: 0 },
                metadata: std::collections::HashMap::new(),
            });
            match outcome {
                ResumeOutcome::BudgetExhausted => continue,
                ResumeOutcome::AwaitingMessages => {
                    if inner.shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    // Bounded poll, not a pure park: a wake arriving
                    // between `resume` returning and the lock below
                    // being taken would otherwise be lost, since there
                    // is no atomic "mark blocked" step here the way
                    // `SharedActorState` gives the pool's ready queue.
                    let mut guard = parked.0.lock();
                    let _ = parked.1.wait_for(&mut guard, Duration::from_millis(50));
                }
                ResumeOutcome::Terminated(reason) => {
                    let _ = inner.monitor.record(SchedulerEvent {
                        timestamp: chrono::Utc::now(),
                        actor_id: None,
                        event_kind: SchedulerEventKind::ActorTerminated {
                            reason_code: reason.code(),
                        },
                        metadata: std::collections::HashMap::new(),
                    });
                    break;
                }
            }
        });
        self.inner.workers.lock().push(handle);
    }

    fn worker_loop(inner: Arc<Inner<Mon>>, worker_index: usize) {
        let _ = inner.monitor.record(SchedulerEvent {
            timestamp: chrono::Utc::now(),
            actor_id: None,
            event_kind: SchedulerEventKind::WorkerStarted { worker_index },
            metadata: std::collections::HashMap::new(),
        });

        loop {
            let slot = {
                let mut jobs = inner.queue.jobs.lock();
                loop {
                    if let Some(slot) = jobs.pop_front() {
                        break Some(slot);
                    }
                    if inner.shutdown.load(Ordering::Acquire) {
                        break None;
                    }
                    inner.queue.condvar.wait(&mut jobs);
                }
            };
            let Some(slot) = slot else {
                break;
            };

            let mut job = match slot.job.lock().take() {
                Some(job) => job,
                // The slot was drained by someone else already; skip.
                None => continue,
            };

            let outcome = job.resume(inner.resume_budget);
            let _ = inner.monitor.record(SchedulerEvent {
                timestamp: chrono::Utc::now(),
                actor_id: None,
                event_kind: SchedulerEventKind::ActorResumed {
                    processed: inner.resume_budget,
                },
                metadata: std::collections::HashMap::new(),
            });

            match outcome {
                ResumeOutcome::BudgetExhausted => {
                    *slot.job.lock() = Some(job);
                    inner.queue.push(slot);
                    let _ = inner.monitor.record(SchedulerEvent {
                        timestamp: chrono::Utc::now(),
                        actor_id: None,
                        event_kind: SchedulerEventKind::BudgetExhausted {
                            budget: inner.resume_budget,
                        },
                        metadata: std::collections::HashMap::new(),
                    });
                }
                ResumeOutcome::AwaitingMessages => {
                    *slot.job.lock() = Some(job);
                    let _ = inner.monitor.record(SchedulerEvent {
                        timestamp: chrono::Utc::now(),
                        actor_id: None,
                        event_kind: SchedulerEventKind::ActorSuspended,
                        metadata: std::collections::HashMap::new(),
                    });
                }
                ResumeOutcome::Terminated(reason) => {
                    let _ = inner.monitor.record(SchedulerEvent {
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
    }

    fn timer_loop(inner: Arc<Inner<Mon>>) {
        loop {
            let action = {
                let mut heap = inner.timer.heap.lock();
                loop {
                    if inner.shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    match heap.due.peek().copied() {
                        None => {
                            inner.timer.condvar.wait(&mut heap);
                        }
                        Some(Reverse((deadline, id))) => {
                            let now = Instant::now();
                            if now >= deadline {
                                heap.due.pop();
                                break heap.pending.remove(&id);
                            }
                            inner.timer.condvar.wait_for(&mut heap, deadline - now);
                        }
                    }
                }
            };
            if let Some(action) = action {
                let _ = inner.monitor.record(SchedulerEvent {
                    timestamp: chrono::Utc::now(),
                    actor_id: None,
                    event_kind: SchedulerEventKind::DelayedActionFired,
                    metadata: std::collections::HashMap::new(),
                });
                let slot = Arc::new(JobSlot {
                    job: Mutex::new(Some(Box::new(ActionJob {
                        action: Some(action),
                    }) as Box<dyn Resumable>)),
                });
                inner.queue.push(slot);
            }
        }
    }
}

impl<Mon: Monitor<SchedulerEvent> + 'static> Scheduler for PoolScheduler<Mon> {
    fn spawn<A: Actor>(&self, actor: A, options: SpawnOptions) -> ActorRef<A::Message> {
        let SpawnedActor {
            mut cell,
            actor_ref,
            state,
        } = ActorCell::spawn(actor, options.address(), self.inner.registry.clone());
        let actor_ref = actor_ref.with_priority_aware(options.is_priority_aware());

        // §6: link/monitor relationships land before the actor is ever
        // handed to a worker, so neither side can race a termination
        // against the spawn itself.
        if let Some(peer) = options.link_target() {
            self.inner.registry.link(actor_ref.id(), peer);
        }
        if let Some(observer) = options.monitor_observer() {
            self.inner.registry.monitor(observer, actor_ref.id());
        }

        if options.is_detached() {
            self.spawn_detached(cell, state);
            return actor_ref;
        }

        let slot = Arc::new(JobSlot {
            job: Mutex::new(None),
        });
        let inner_for_waker = Arc::clone(&self.inner);
        let slot_for_waker = Arc::clone(&slot);
        let state_for_waker = state.clone();
        cell.set_waker(Arc::new(move || {
            if state_for_waker.wake_if_blocked() {
                inner_for_waker.queue.push(Arc::clone(&slot_for_waker));
            }
        }));

        *slot.job.lock() = Some(Box::new(cell));
        self.inner.queue.push(slot);

        actor_ref
    }

    fn schedule_action(&self, action: Action) {
        self.push_new_job(Box::new(ActionJob {
            action: Some(action),
        }));
    }

    fn delay_action(&self, action: Action, delay: Duration) {
        self.inner.timer.schedule(action, delay);
    }

    fn start(&self) {
        let mut workers = self.inner.workers.lock();
        if !workers.is_empty() {
            return;
        }
        for worker_index in 0..self.inner.worker_count {
            let inner = Arc::clone(&self.inner);
            workers.push(thread::spawn(move || Self::worker_loop(inner, worker_index)));
        }
        drop(workers);

        let mut timer_thread = self.inner.timer_thread.lock();
        if timer_thread.is_none() {
            let inner = Arc::clone(&self.inner);
            *timer_thread = Some(thread::spawn(move || Self::timer_loop(inner)));
        }
    }

    fn stop(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.queue.condvar.notify_all();
        self.inner.timer.condvar.notify_all();

        for handle in self.inner.workers.lock().drain(..) {
            let _ = handle.join();
        }
        if let Some(handle) = self.inner.timer_thread.lock().take() {
            let _ = handle.join();
        }
    }

    fn registry(&self) -> &ActorRegistry {
        &self.inner.registry
    }
}

impl<Mon: Monitor<SchedulerEvent> + 'static> Drop for PoolScheduler<Mon> {
    fn drop(&mut self) {
        if !self.inner.workers.lock().is_empty() || self.inner.timer_thread.lock().is_some() {
            self.stop();
        }
    }
}
