// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
// (none)

/// Actor lifecycle state, per the data model's
/// `ready → running → about_to_block → blocked → done`.
///
/// Transitions are linearizable per actor: only whichever worker
/// currently holds the scheduler's lease on the actor may move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// Enqueued and waiting for a scheduler lease.
    Ready,
    /// Currently executing its resume step on a worker.
    Running,
    /// Checked the mailbox once, found it empty, about to recheck
    /// before committing to `Blocked` (the double-check of §4.1).
    AboutToBlock,
    /// Suspended; an enqueue will atomically transition it back to `Ready`.
    Blocked,
    /// Terminated; all attachables fired, teardown complete.
    Done,
}

impl Default for ActorState {
    fn default() -> Self {
        Self::Ready
    }
}

/// Lifecycle tracker: current state plus when it last changed and how
/// many times the actor has been restarted by a supervisor.
#[derive(Debug, Clone)]
pub struct ActorLifecycle {
    state: ActorState,
    last_state_change: DateTime<Utc>,
    restart_count: u32,
}

impl ActorLifecycle {
    /// Create a new tracker in the `Ready` state.
    pub fn new() -> Self {
        Self {
            state: ActorState::Ready,
            last_state_change: Utc::now(),
            restart_count: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> ActorState {
        self.state
    }

    /// When the state last changed.
    pub fn last_state_change(&self) -> DateTime<Utc> {
        self.last_state_change
    }

    /// How many times this actor has been restarted.
    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Move to a new state, stamping the transition time.
    pub fn transition_to(&mut self, state: ActorState) {
        self.state = state;
        self.last_state_change = Utc::now();
    }

    /// Record a restart (used by a supervising `Behavior` loop).
    pub fn record_restart(&mut self) {
        self.restart_count += 1;
        self.transition_to(ActorState::Ready);
    }
}

impl Default for ActorLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorState {
    fn to_tag(self) -> u8 {
        match self {
            ActorState::Ready => 0,
            ActorState::Running => 1,
            ActorState::AboutToBlock => 2,
            ActorState::Blocked => 3,
            ActorState::Done => 4,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ActorState::Ready,
            1 => ActorState::Running,
            2 => ActorState::AboutToBlock,
            3 => ActorState::Blocked,
            _ => ActorState::Done,
        }
    }
}

/// Atomically shared view of an actor's [`ActorState`], held by both
/// the `ActorCell` (which drives the transitions) and every
/// [`crate::mailbox::MailboxSender`] clone (which needs to notice a
/// `Blocked → Ready` wakeup to re-enqueue the actor with the
/// scheduler).
///
/// The double-check suspend protocol from §4.1 lives here:
/// `try_block` only succeeds out of `AboutToBlock`, so a send racing
/// with the actor's second empty-check always wins and forces a retry
/// rather than a lost wakeup.
#[derive(Clone)]
pub struct SharedActorState {
    tag: Arc<AtomicU8>,
}

impl SharedActorState {
    pub fn new(initial: ActorState) -> Self {
        Self {
            tag: Arc::new(AtomicU8::new(initial.to_tag())),
        }
    }

    pub fn load(&self) -> ActorState {
        ActorState::from_tag(self.tag.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ActorState) {
        self.tag.store(state.to_tag(), Ordering::Release);
    }

    /// Move `Running → AboutToBlock`, the first half of the
    /// double-check. Always succeeds; only the resume loop calls this.
    pub fn begin_about_to_block(&self) {
        self.store(ActorState::AboutToBlock);
    }

    /// Commit `AboutToBlock → Blocked`. Fails (returns `false`) if a
    /// concurrent enqueue already flipped the state back to `Ready`,
    /// in which case the resume loop must recheck the mailbox instead
    /// of suspending.
    pub fn try_commit_blocked(&self) -> bool {
        self.tag
            .compare_exchange(
                ActorState::AboutToBlock.to_tag(),
                ActorState::Blocked.to_tag(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Called by an enqueuer after pushing a message. If the actor was
    /// `Blocked`, atomically moves it to `Ready` and reports `true` so
    /// the caller knows to hand it back to the scheduler.
    pub fn wake_if_blocked(&self) -> bool {
        self.tag
            .compare_exchange(
                ActorState::Blocked.to_tag(),
                ActorState::Ready.to_tag(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
