//! The contract shared by [`PoolScheduler`](super::pool::PoolScheduler)
//! and [`TestScheduler`](super::test::TestScheduler): spawn an actor,
//! queue an arbitrary action, delay an action, and start/stop the
//! underlying workers (§4.4).

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::actor::{Actor, ActorCell, ActorRef, ResumeOutcome};
use crate::broker::ActorRegistry;
use crate::util::ids::{ActorAddress, ActorId};

/// A unit of work a scheduler can hand a bounded slice of execution
/// to. `ActorCell<A>` is the only production implementation; `resume`
/// just forwards to the cell's own inherent method of the same name.
pub trait Resumable: Send {
    /// Process at most `budget` envelopes. See
    /// [`ResumeOutcome`](crate::actor::ResumeOutcome) for what each
    /// result means to the caller.
    fn resume(&mut self, budget: u32) -> ResumeOutcome;
}

impl<A: Actor> Resumable for ActorCell<A> {
    fn resume(&mut self, budget: u32) -> ResumeOutcome {
        ActorCell::resume(self, budget)
    }
}

/// A plain closure scheduled alongside actor resume steps, run exactly
/// once (§4.4's `schedule_action`/`delay_action`).
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// How a freshly spawned actor should be addressed and wired into the
/// system (§6's Spawn API: `monitored`/`linked`/`detached`/
/// `blocking_api`/`priority_aware`).
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    name: Option<String>,
    link_to: Option<ActorId>,
    monitored_by: Option<ActorId>,
    detached: bool,
    blocking_api: bool,
    priority_aware: bool,
}

impl SpawnOptions {
    /// Spawn anonymously (the default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn under a resolvable name (see
    /// [`ActorRegistry::resolve_name`](crate::broker::ActorRegistry)).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// `linked`: establish a bidirectional link with `peer` atomically,
    /// before the new actor becomes schedulable — neither side can
    /// observe the other having started without the link already being
    /// in place (§6).
    #[must_use]
    pub fn linked_to(mut self, peer: ActorId) -> Self {
        self.link_to = Some(peer);
        self
    }

    /// `monitored`: `observer` begins monitoring the new actor
    /// atomically, before it becomes schedulable, so a terminate racing
    /// the spawn itself is never missed (§6).
    #[must_use]
    pub fn monitored_by(mut self, observer: ActorId) -> Self {
        self.monitored_by = Some(observer);
        self
    }

    /// `detached`: give the actor a dedicated OS thread instead of a
    /// slot in the shared work-sharing pool (§6). A no-op on
    /// [`TestScheduler`](super::test::TestScheduler), which is
    /// single-threaded by construction.
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    /// `blocking_api`: permits the actor to use the blocking receive
    /// helpers in [`crate::actor::blocking`] instead of a `Behavior`
    /// dispatch loop (§6, §9). Implies `detached`, since a blocking
    /// receive call would otherwise starve the shared pool.
    #[must_use]
    pub fn blocking_api(mut self) -> Self {
        self.blocking_api = true;
        self.detached = true;
        self
    }

    /// `priority_aware`: enables this actor's high-priority mailbox
    /// partition. Without it, `ActorRef::tell_priority` silently
    /// downgrades to normal priority (§6).
    #[must_use]
    pub fn priority_aware(mut self) -> Self {
        self.priority_aware = true;
        self
    }

    /// The address a spawn call with these options will produce.
    pub fn address(&self) -> ActorAddress {
        match &self.name {
            Some(name) => ActorAddress::named(name.clone()),
            None => ActorAddress::anonymous(),
        }
    }

    pub fn link_target(&self) -> Option<ActorId> {
        self.link_to
    }

    pub fn monitor_observer(&self) -> Option<ActorId> {
        self.monitored_by
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn is_blocking_api(&self) -> bool {
        self.blocking_api
    }

    pub fn is_priority_aware(&self) -> bool {
        self.priority_aware
    }
}

/// One contract, two implementations (§4.4): a fixed-size
/// work-sharing thread pool for production, and a deterministic
/// single-threaded scheduler for tests. Neither is object-safe
/// (`spawn` is generic over `A`), so this trait is used as a static
/// bound, never as `dyn Scheduler`.
pub trait Scheduler {
    /// Create an `ActorCell` for `actor`, install its waker, hand it
    /// its first scheduling lease, and return the reference other
    /// actors use to send to it.
    fn spawn<A: Actor>(&self, actor: A, options: SpawnOptions) -> ActorRef<A::Message>;

    /// Queue `action` to run once, FIFO with respect to other queued
    /// actions and actor resume steps.
    fn schedule_action(&self, action: Action);

    /// Queue `action` to run once no sooner than `delay` from now.
    fn delay_action(&self, action: Action, delay: Duration);

    /// Start the scheduler's workers. A no-op if already started.
    fn start(&self);

    /// Stop accepting new work and join the scheduler's workers.
    fn stop(&self);

    /// The registry backing this scheduler's spawned actors.
    fn registry(&self) -> &ActorRegistry;
}
