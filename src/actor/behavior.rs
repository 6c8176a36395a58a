//! Behaviors and the behavior stack: the clause-matching dispatch
//! described in §4.2, and the `become`/`unbecome` stack discipline
//! that replaces or layers behaviors at runtime.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::context::ActorContext;
use super::traits::Actor;

/// A single match clause within a [`Behavior`]. Returns `None` to let
/// the next clause try the message (mirroring an Erlang `receive`
/// clause that doesn't match the tuple shape it was given); `Some`
/// commits to having handled it.
type Clause<A> = Box<
    dyn FnMut(
            &mut A,
            &<A as Actor>::Message,
            &mut ActorContext<A>,
        ) -> Option<Result<(), <A as Actor>::Error>>
        + Send,
>;

/// An ordered set of match clauses plus an optional per-frame timeout.
///
/// A `Behavior` is what an actor is currently matching messages
/// against. `Actor::initial_behavior` builds the first one; handlers
/// can swap in a different one at runtime via
/// [`ActorContext::become_behavior`].
pub struct Behavior<A: Actor> {
    clauses: Vec<Clause<A>>,
    timeout: Option<Duration>,
}

impl<A: Actor> Behavior<A> {
    /// An empty behavior matching nothing; build it up with [`Behavior::on`].
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            timeout: None,
        }
    }

    /// Append a match clause, tried in the order added.
    #[must_use]
    pub fn on<F>(mut self, clause: F) -> Self
    where
        F: FnMut(
                &mut A,
                &A::Message,
                &mut ActorContext<A>,
            ) -> Option<Result<(), A::Error>>
            + Send
            + 'static,
    {
        self.clauses.push(Box::new(clause));
        self
    }

    /// Set the idle timeout for this frame (§4.2): if no message is
    /// dequeued before it elapses, a synthetic `Timeout` envelope is
    /// delivered instead.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Try every clause in order until one matches.
    pub(crate) fn dispatch(
        &mut self,
        actor: &mut A,
        message: &A::Message,
        ctx: &mut ActorContext<A>,
    ) -> Option<Result<(), A::Error>> {
        for clause in &mut self.clauses {
            if let Some(result) = clause(actor, message, ctx) {
                return Some(result);
            }
        }
        None
    }
}

impl<A: Actor> Default for Behavior<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a new behavior replaces the current stack top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BecomePolicy {
    /// Pop the current frame before pushing the new one (the default).
    Replace,
    /// Push on top, keeping the current frame beneath it so
    /// `unbecome` can return to it.
    Keep,
}

/// A transition an actor's handler requested during the current
/// resume step. Applied by [`super::cell::ActorCell`] once the clause
/// that produced it returns, never mid-dispatch.
pub enum Transition<A: Actor> {
    Become(Behavior<A>, BecomePolicy),
    Unbecome,
}

/// The stack of active behaviors. Per §4.2's redesign note, an
/// `unbecome` that empties the stack is equivalent to the actor
/// requesting its own normal termination.
pub struct BehaviorStack<A: Actor> {
    frames: Vec<Behavior<A>>,
}

impl<A: Actor> BehaviorStack<A> {
    pub fn new(initial: Behavior<A>) -> Self {
        Self {
            frames: vec![initial],
        }
    }

    /// The frame currently receiving messages.
    pub fn top_mut(&mut self) -> Option<&mut Behavior<A>> {
        self.frames.last_mut()
    }

    pub fn current_timeout(&self) -> Option<Duration> {
        self.frames.last().and_then(Behavior::timeout)
    }

    pub fn apply(&mut self, transition: Transition<A>) {
        match transition {
            Transition::Become(next, BecomePolicy::Replace) => {
                self.frames.pop();
                self.frames.push(next);
            }
            Transition::Become(next, BecomePolicy::Keep) => {
                self.frames.push(next);
            }
            Transition::Unbecome => {
                self.frames.pop();
            }
        }
    }

    /// `true` once `unbecome` has drained every frame — the signal
    /// the cell uses to terminate the actor with `ExitReason::NORMAL`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
