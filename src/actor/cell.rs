//! `ActorCell`: the resume-step driver that pairs a mailbox, a
//! behavior stack, and an actor instance, and knows how to advance
//! them by a bounded amount of work per scheduler lease (§4.1, §5).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Duration as ChronoDuration, Utc};

// Layer 3: Internal module imports
use super::behavior::BehaviorStack;
use super::context::ActorContext;
use super::exit::ExitReason;
use super::reference::ActorRef;
use super::state::{ActorState, SharedActorState};
use super::traits::{Actor, ErrorAction};
use crate::broker::registry::ActorRegistry;
use crate::mailbox::{Mailbox, Waker};
use crate::message::{Envelope, EnvelopeBody, Priority};
use crate::util::ids::ActorAddress;

/// The result of driving one envelope through dispatch.
enum StepOutcome {
    Processed,
    MailboxEmpty,
    Terminated(ExitReason),
}

/// What a scheduler sees after calling [`ActorCell::resume`].
pub enum ResumeOutcome {
    /// The per-lease message budget ran out; there may be more work —
    /// re-enqueue this actor as ready.
    BudgetExhausted,
    /// The mailbox is empty and the actor is now `Blocked`; do nothing
    /// until a `MailboxSender` wakes it.
    AwaitingMessages,
    /// The actor ran its full teardown and will never run again.
    Terminated(ExitReason),
}

/// The live state of one actor: its user-defined instance, mailbox,
/// behavior stack, and context, bundled together so a scheduler can
/// treat it as a single opaque unit of work.
pub struct ActorCell<A: Actor> {
    actor: A,
    mailbox: Mailbox<A::Message>,
    behaviors: BehaviorStack<A>,
    context: ActorContext<A>,
    state: SharedActorState,
    registry: ActorRegistry,
    started: bool,
    frame_started_at: DateTime<Utc>,
}

/// Everything a spawn call hands back: the cell (for the scheduler to
/// drive), a reference other actors can send through, and the shared
/// state cell a `MailboxSender` consults to decide whether to wake it.
pub struct SpawnedActor<A: Actor> {
    pub cell: ActorCell<A>,
    pub actor_ref: ActorRef<A::Message>,
    pub state: SharedActorState,
}

impl<A: Actor> ActorCell<A> {
    pub fn spawn(actor: A, address: ActorAddress, registry: ActorRegistry) -> SpawnedActor<A> {
        let (mailbox, actor_ref) = registry.spawn_mailbox::<A::Message>(address);
        let context = ActorContext::new(actor_ref.clone(), registry.clone());
        let state = SharedActorState::new(ActorState::Ready);
        let cell = ActorCell {
            actor,
            mailbox,
            behaviors: BehaviorStack::new(A::initial_behavior()),
            context,
            state: state.clone(),
            registry,
            started: false,
            frame_started_at: Utc::now(),
        };
        SpawnedActor {
            cell,
            actor_ref,
            state,
        }
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    /// Install the callback a scheduler runs whenever an enqueue lands
    /// on this actor's mailbox (§4.1's wake-on-enqueue half of the
    /// double-check suspension protocol). A scheduler installs this
    /// right after `spawn`, before the cell's first `resume`.
    pub fn set_waker(&self, waker: Waker) {
        self.mailbox.set_waker(waker);
    }

    /// Drive this actor forward by at most `budget` processed
    /// envelopes (§5's bounded resume-step model — no actor may
    /// monopolize a worker).
    pub fn resume(&mut self, budget: u32) -> ResumeOutcome {
        self.state.store(ActorState::Running);

        if !self.started {
            self.started = true;
            if let Err(err) = self.actor.pre_start(&mut self.context) {
                let _ = err;
                return self.into_resume_outcome(self.terminate(ExitReason::UNHANDLED_EXCEPTION));
            }
            if let Some(reason) = self.context.take_planned_exit() {
                return self.into_resume_outcome(self.terminate(reason));
            }
        }

        let mut processed = 0u32;
        loop {
            if processed >= budget {
                self.state.store(ActorState::Ready);
                return ResumeOutcome::BudgetExhausted;
            }

            match self.drive_one() {
                StepOutcome::Terminated(reason) => {
                    return ResumeOutcome::Terminated(reason);
                }
                StepOutcome::Processed => {
                    processed += 1;
                }
                StepOutcome::MailboxEmpty => match self.suspend_or_recheck() {
                    Some(outcome) => return outcome,
                    None => continue,
                },
            }
        }
    }

    /// The double-check suspension protocol (§4.1): move to
    /// `AboutToBlock`, recheck the mailbox once more, and only commit
    /// to `Blocked` if it is still empty. A send racing with this
    /// window always wins — it either lands before the recheck (we
    /// see it) or flips the state back to `Ready` after we've already
    /// committed, in which case `try_commit_blocked` fails and we loop.
    fn suspend_or_recheck(&mut self) -> Option<ResumeOutcome> {
        self.state.begin_about_to_block();
        match self.mailbox.try_dequeue() {
            Some(envelope) => {
                self.state.store(ActorState::Running);
                match self.dispatch(envelope) {
                    StepOutcome::Terminated(reason) => Some(ResumeOutcome::Terminated(reason)),
                    _ => None,
                }
            }
            None => {
                if self.state.try_commit_blocked() {
                    Some(ResumeOutcome::AwaitingMessages)
                } else {
                    self.state.store(ActorState::Running);
                    None
                }
            }
        }
    }

    fn drive_one(&mut self) -> StepOutcome {
        let now = Utc::now();
        if let Some(request_id) = self.context.drain_expired_requests(now).into_iter().next() {
            return self.dispatch(Envelope::request_timed_out(request_id));
        }
        if let Some(timeout) = self.behaviors.current_timeout() {
            let elapsed = now - self.frame_started_at;
            if elapsed >= ChronoDuration::from_std(timeout).unwrap_or(ChronoDuration::zero()) {
                self.frame_started_at = now;
                return self.dispatch(Envelope::timeout());
            }
        }
        match self.mailbox.try_dequeue() {
            Some(envelope) => self.dispatch(envelope),
            None => StepOutcome::MailboxEmpty,
        }
    }

    fn dispatch(&mut self, envelope: Envelope<A::Message>) -> StepOutcome {
        self.context
            .set_current_envelope_meta(envelope.sender(), envelope.response_id());
        self.frame_started_at = Utc::now();
        let priority = envelope.priority();

        let outcome = match envelope.into_owned() {
            EnvelopeBody::User(message) => self.dispatch_user(message, priority),
            EnvelopeBody::Exit { from, reason } => {
                if self.context.trap_exit() {
                    self.actor.on_exit(from, &reason, &mut self.context);
                    StepOutcome::Processed
                } else if reason.is_normal() {
                    StepOutcome::Processed
                } else {
                    self.terminate(reason)
                }
            }
            EnvelopeBody::Down { who, reason } => {
                self.actor.on_down(who, &reason, &mut self.context);
                StepOutcome::Processed
            }
            EnvelopeBody::Timeout => {
                self.actor.on_timeout(&mut self.context);
                StepOutcome::Processed
            }
            EnvelopeBody::RequestTimedOut(request_id) => {
                self.actor.on_request_timeout(request_id, &mut self.context);
                StepOutcome::Processed
            }
        };

        self.context.set_current_envelope_meta(None, None);
        self.after_dispatch(outcome)
    }

    fn dispatch_user(&mut self, message: A::Message, priority: Priority) -> StepOutcome {
        let result = self
            .behaviors
            .top_mut()
            .and_then(|top| top.dispatch(&mut self.actor, &message, &mut self.context));
        match result {
            Some(Ok(())) => StepOutcome::Processed,
            Some(Err(err)) => self.handle_error(err),
            // No clause matched: skip (§4.2) — put it back at the head
            // of its own priority class instead of dropping it.
            None => {
                self.mailbox
                    .requeue_front(Envelope::user(message).with_priority(priority));
                StepOutcome::Processed
            }
        }
    }

    fn handle_error(&mut self, error: A::Error) -> StepOutcome {
        match self.actor.on_error(error, &mut self.context) {
            ErrorAction::Stop => self.terminate(ExitReason::UNHANDLED_EXCEPTION),
            ErrorAction::Resume => StepOutcome::Processed,
            ErrorAction::Restart => {
                self.behaviors = BehaviorStack::new(A::initial_behavior());
                match self.actor.pre_start(&mut self.context) {
                    Ok(()) => StepOutcome::Processed,
                    Err(_) => self.terminate(ExitReason::UNHANDLED_EXCEPTION),
                }
            }
        }
    }

    fn after_dispatch(&mut self, outcome: StepOutcome) -> StepOutcome {
        if matches!(outcome, StepOutcome::Terminated(_)) {
            return outcome;
        }
        if let Some(transition) = self.context.take_transition() {
            self.behaviors.apply(transition);
            if self.behaviors.is_empty() {
                return self.terminate(ExitReason::NORMAL);
            }
            self.frame_started_at = Utc::now();
        }
        if let Some(reason) = self.context.take_planned_exit() {
            return self.terminate(reason);
        }
        outcome
    }

    fn terminate(&mut self, reason: ExitReason) -> StepOutcome {
        self.mailbox.close();
        self.context.attachables_mut().fire_all(&reason);
        for request_id in self.context.drain_all_pending() {
            self.actor.on_broken_promise(request_id, &mut self.context);
        }
        self.actor.post_stop(&reason);
        self.registry.notify_termination(self.context.id(), &reason);
        self.state.store(ActorState::Done);
        StepOutcome::Terminated(reason)
    }

    fn into_resume_outcome(&self, outcome: StepOutcome) -> ResumeOutcome {
        match outcome {
            StepOutcome::Terminated(reason) => ResumeOutcome::Terminated(reason),
            _ => ResumeOutcome::BudgetExhausted,
        }
    }
}
