//! The blocking receive surface (§6's `blocking_api` capability, §9).
//!
//! Grounded in cppa's curried `receive`/`receive_for`/`receive_while`/
//! `do_receive(...).until(...)` family
//! (`examples/original_source/cppa/receive.hpp`,
//! `examples/original_source/cppa/detail/receive_loop_helper.hpp`): a
//! fixed set of match clauses tried against the next dequeued message,
//! looped by whichever helper the caller reaches for. A
//! [`BlockingActor`] never sits in [`super::cell::ActorCell`]'s
//! resume-step dispatch at all — it runs `run` to completion on its
//! own dedicated OS thread (always `detached`, per §6: "a blocking
//! receive call would otherwise starve the shared pool"), parking that
//! thread between envelopes instead of yielding back to a scheduler.
//!
//! A `User` message no clause matches is put back at the head of its
//! own priority class rather than dropped, matching
//! `ActorCell::dispatch_user`'s skip policy (§4.2) — the same message
//! is tried again the next time this actor calls into a
//! `receive`-family helper, once its handler set may have changed.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::{Condvar, Mutex};

// Layer 3: Internal module imports
use super::exit::ExitReason;
use super::reference::{ActorRef, ReplyTo};
use crate::broker::registry::ActorRegistry;
use crate::mailbox::Mailbox;
use crate::message::{Envelope, EnvelopeBody, Message};
use crate::util::ids::{ActorAddress, ActorId, RequestId};

/// A computation unit whose message loop is written by hand instead of
/// matched against a standing `Behavior` stack. Parallels [`super::Actor`]
/// but trades cooperative resume steps for a single `run` call owning
/// its own thread for as long as it likes.
pub trait BlockingActor: Send + 'static {
    type Message: Message;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs to completion on this actor's dedicated thread. Returning
    /// from `run` terminates the actor with `ExitReason::NORMAL`
    /// unless `ctx.quit` was already called with something else.
    fn run(&mut self, ctx: &mut BlockingActorContext<Self>)
    where
        Self: Sized;

    /// Called once, before `run`. The default does nothing.
    fn pre_start(&mut self, _ctx: &mut BlockingActorContext<Self>) -> Result<(), Self::Error>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// Called once, after teardown. The default does nothing.
    fn post_stop(&mut self, _reason: &ExitReason) {}

    /// Called when a linked peer exits and `trap_exit` is enabled.
    /// The default does nothing.
    fn on_exit(&mut self, _from: ActorId, _reason: &ExitReason, _ctx: &mut BlockingActorContext<Self>)
    where
        Self: Sized,
    {
    }

    /// Called when a monitored actor terminates. The default does
    /// nothing.
    fn on_down(&mut self, _who: ActorId, _reason: &ExitReason, _ctx: &mut BlockingActorContext<Self>)
    where
        Self: Sized,
    {
    }

    /// Called when a synthetic `Timeout` envelope is dequeued (only
    /// reachable if a caller manually enqueues one; blocking actors
    /// have no per-frame timeout of their own). The default does
    /// nothing.
    fn on_timeout(&mut self, _ctx: &mut BlockingActorContext<Self>)
    where
        Self: Sized,
    {
    }

    /// Called by [`BlockingActorContext::receive_response`] when its
    /// deadline elapses with no matching reply. The default does
    /// nothing.
    fn on_request_timeout(&mut self, _request_id: RequestId, _ctx: &mut BlockingActorContext<Self>)
    where
        Self: Sized,
    {
    }
}

/// A single match clause tried, in order, against the next dequeued
/// user message. `None` lets the next clause try; if none match, the
/// message is put back at the head of its priority class (§4.2 skip
/// policy) instead of being dropped.
type Clause<A> = Box<
    dyn FnMut(&mut A, &<A as BlockingActor>::Message, &mut BlockingActorContext<A>) -> Option<()>
        + Send,
>;

/// The match clauses passed to every `receive`-family call, built the
/// same way [`super::Behavior`] is.
pub struct Handlers<A: BlockingActor> {
    clauses: Vec<Clause<A>>,
}

impl<A: BlockingActor> Handlers<A> {
    pub fn new() -> Self {
        Self { clauses: Vec::new() }
    }

    #[must_use]
    pub fn on<F>(mut self, clause: F) -> Self
    where
        F: FnMut(&mut A, &A::Message, &mut BlockingActorContext<A>) -> Option<()> + Send + 'static,
    {
        self.clauses.push(Box::new(clause));
        self
    }

    fn dispatch(&mut self, actor: &mut A, message: &A::Message, ctx: &mut BlockingActorContext<A>) -> bool {
        for clause in &mut self.clauses {
            if clause(actor, message, ctx).is_some() {
                return true;
            }
        }
        false
    }
}

impl<A: BlockingActor> Default for Handlers<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// What [`BlockingActorContext::receive_response`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A matching reply was dispatched.
    Delivered,
    /// The deadline elapsed with no matching reply.
    TimedOut,
    /// `quit` was called (by a handler, or by an untrapped `Exit`)
    /// before a reply arrived.
    Quit,
}

/// The handle a [`BlockingActor`] uses to talk back to the rest of the
/// system and drive its own receive loop.
pub struct BlockingActorContext<A: BlockingActor> {
    id: ActorId,
    address: ActorAddress,
    created_at: DateTime<Utc>,
    self_ref: ActorRef<A::Message>,
    registry: ActorRegistry,
    mailbox: Mailbox<A::Message>,
    trap_exit: bool,
    next_request_id: u64,
    planned_exit: Option<ExitReason>,
    parked: Arc<(Mutex<()>, Condvar)>,
}

impl<A: BlockingActor> BlockingActorContext<A> {
    fn new(
        self_ref: ActorRef<A::Message>,
        registry: ActorRegistry,
        mailbox: Mailbox<A::Message>,
        parked: Arc<(Mutex<()>, Condvar)>,
    ) -> Self {
        Self {
            id: self_ref.id(),
            address: self_ref.address().clone(),
            created_at: Utc::now(),
            self_ref,
            registry,
            mailbox,
            trap_exit: false,
            next_request_id: 1,
            planned_exit: None,
            parked,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn self_ref(&self) -> ActorRef<A::Message> {
        self.self_ref.clone()
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    /// Fire-and-forget send.
    pub fn send<M: Message>(&self, target: &ActorRef<M>, message: M) {
        target.tell(message);
    }

    /// Send a request, returning the id embedded in the `ReplyTo`
    /// handed to `build`. Unlike `ActorContext::request`, no deadline
    /// sweep is registered here — there is no per-step resume loop to
    /// run one. Pass a `timeout` to [`Self::receive_response`] instead.
    pub fn request<M, F>(&mut self, target: &ActorRef<M>, build: F) -> RequestId
    where
        M: Message,
        F: FnOnce(ReplyTo<A::Message>) -> M,
    {
        let request_id = self.alloc_request_id();
        let reply_to = ReplyTo::new(self.self_ref(), self.id, request_id);
        target.tell(build(reply_to));
        request_id
    }

    fn alloc_request_id(&mut self) -> RequestId {
        let id = RequestId::from_raw(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    pub fn link(&self, peer: ActorId) {
        self.registry.link(self.id, peer);
    }

    pub fn unlink(&self, peer: ActorId) {
        self.registry.unlink(self.id, peer);
    }

    pub fn monitor(&self, target: ActorId) {
        self.registry.monitor(self.id, target);
    }

    pub fn demonitor(&self, target: ActorId) {
        self.registry.demonitor(self.id, target);
    }

    pub fn trap_exit(&self) -> bool {
        self.trap_exit
    }

    pub fn set_trap_exit(&mut self, trap: bool) {
        self.trap_exit = trap;
    }

    /// Request termination with `reason`. The currently running
    /// `receive`-family call returns as soon as it notices, so `run`
    /// should check back in and return promptly afterward.
    pub fn quit(&mut self, reason: ExitReason) {
        self.planned_exit = Some(reason);
    }

    fn take_planned_exit(&mut self) -> Option<ExitReason> {
        self.planned_exit.take()
    }

    fn is_quitting(&self) -> bool {
        self.planned_exit.is_some()
    }

    /// Block until an envelope is available. Parks this OS thread
    /// between polls rather than spinning, mirroring
    /// `PoolScheduler::spawn_detached`'s park loop; the bounded wait is
    /// a safety net against a wake racing the park itself, not the
    /// primary wake path.
    fn recv_raw(&mut self) -> Envelope<A::Message> {
        loop {
            if let Some(envelope) = self.mailbox.try_dequeue() {
                return envelope;
            }
            let mut guard = self.parked.0.lock();
            if self.mailbox.is_empty() {
                let _ = self.parked.1.wait_for(&mut guard, Duration::from_millis(50));
            }
        }
    }

    /// Like [`Self::recv_raw`] but gives up once `deadline` passes.
    fn recv_raw_before(&mut self, deadline: DateTime<Utc>) -> Option<Envelope<A::Message>> {
        loop {
            if let Some(envelope) = self.mailbox.try_dequeue() {
                return Some(envelope);
            }
            if Utc::now() >= deadline {
                return None;
            }
            let mut guard = self.parked.0.lock();
            if self.mailbox.is_empty() {
                let _ = self.parked.1.wait_for(&mut guard, Duration::from_millis(10));
            }
        }
    }

    /// One dequeue-and-dispatch step: `Exit`/`Down`/`Timeout` take the
    /// same dedicated paths `ActorCell::dispatch` gives cooperative
    /// actors; a `User` envelope that no clause matches is put back at
    /// the head of its priority class (§4.2's "skip" policy) instead
    /// of being dropped.
    fn step(&mut self, actor: &mut A, handlers: &mut Handlers<A>) {
        let envelope = self.recv_raw();
        let priority = envelope.priority();
        match envelope.into_owned() {
            EnvelopeBody::User(message) => {
                if !handlers.dispatch(actor, &message, self) {
                    self.mailbox
                        .requeue_front(Envelope::user(message).with_priority(priority));
                }
            }
            EnvelopeBody::Exit { from, reason } => {
                if self.trap_exit {
                    actor.on_exit(from, &reason, self);
                } else if !reason.is_normal() {
                    self.quit(reason);
                }
            }
            EnvelopeBody::Down { who, reason } => {
                actor.on_down(who, &reason, self);
            }
            EnvelopeBody::Timeout => {
                actor.on_timeout(self);
            }
            EnvelopeBody::RequestTimedOut(request_id) => {
                actor.on_request_timeout(request_id, self);
            }
        }
    }

    /// `receive(handlers)` (§6): dequeue and dispatch exactly one
    /// message.
    pub fn receive(&mut self, actor: &mut A, handlers: &mut Handlers<A>) {
        if self.is_quitting() {
            return;
        }
        self.step(actor, handlers);
    }

    /// `receive_for(i, end)(handlers)` (§6): repeat [`Self::receive`]
    /// exactly `count` times, stopping early if `quit` was called.
    pub fn receive_for(&mut self, actor: &mut A, count: usize, handlers: &mut Handlers<A>) {
        for _ in 0..count {
            if self.is_quitting() {
                break;
            }
            self.step(actor, handlers);
        }
    }

    /// `receive_while(pred)(handlers)` (§6): `while pred() { receive(...) }`.
    pub fn receive_while(
        &mut self,
        actor: &mut A,
        mut pred: impl FnMut() -> bool,
        handlers: &mut Handlers<A>,
    ) {
        while !self.is_quitting() && pred() {
            self.step(actor, handlers);
        }
    }

    /// `do_receive(handlers).until(pred)` (§6): `do { receive(...) } while !pred()`.
    pub fn do_receive(&mut self, actor: &mut A, handlers: &mut Handlers<A>, mut until: impl FnMut() -> bool) {
        loop {
            self.step(actor, handlers);
            if self.is_quitting() || until() {
                break;
            }
        }
    }

    /// `receive_response(req)(handlers)` (§6): handle ordinary control
    /// envelopes the way [`Self::receive`] does, until an envelope
    /// `handlers` accepts arrives or `timeout` elapses, whichever comes
    /// first. `timeout` of `None` waits indefinitely.
    pub fn receive_response(
        &mut self,
        actor: &mut A,
        request_id: RequestId,
        handlers: &mut Handlers<A>,
        timeout: Option<Duration>,
    ) -> ResponseOutcome {
        let deadline = timeout.map(|d| Utc::now() + ChronoDuration::from_std(d).unwrap_or_default());
        loop {
            if self.is_quitting() {
                return ResponseOutcome::Quit;
            }
            let next = match deadline {
                Some(deadline) => self.recv_raw_before(deadline),
                None => Some(self.recv_raw()),
            };
            let Some(envelope) = next else {
                actor.on_request_timeout(request_id, self);
                return ResponseOutcome::TimedOut;
            };
            let priority = envelope.priority();
            match envelope.into_owned() {
                EnvelopeBody::User(message) => {
                    if handlers.dispatch(actor, &message, self) {
                        return ResponseOutcome::Delivered;
                    }
                    self.mailbox
                        .requeue_front(Envelope::user(message).with_priority(priority));
                }
                EnvelopeBody::Exit { from, reason } => {
                    if self.trap_exit {
                        actor.on_exit(from, &reason, self);
                    } else if !reason.is_normal() {
                        self.quit(reason);
                    }
                }
                EnvelopeBody::Down { who, reason } => {
                    actor.on_down(who, &reason, self);
                }
                EnvelopeBody::Timeout => {
                    actor.on_timeout(self);
                }
                EnvelopeBody::RequestTimedOut(timed_out_id) => {
                    actor.on_request_timeout(timed_out_id, self);
                    if timed_out_id == request_id {
                        return ResponseOutcome::TimedOut;
                    }
                }
            }
        }
    }
}

/// Spawn a [`BlockingActor`] on its own dedicated thread (§6's
/// `blocking_api` implies `detached`). Registered in `registry` like
/// any other actor, so `link`/`monitor`/name resolution all work the
/// same from the caller's side.
pub fn spawn_blocking_actor<A: BlockingActor>(
    registry: &ActorRegistry,
    address: ActorAddress,
    mut actor: A,
) -> ActorRef<A::Message> {
    let (mailbox, actor_ref) = registry.spawn_mailbox::<A::Message>(address);
    let parked = Arc::new((Mutex::new(()), Condvar::new()));
    let parked_for_waker = Arc::clone(&parked);
    mailbox.set_waker(Arc::new(move || {
        let _guard = parked_for_waker.0.lock();
        parked_for_waker.1.notify_one();
    }));

    let mut ctx = BlockingActorContext::new(actor_ref.clone(), registry.clone(), mailbox, parked);
    let registry_for_thread = registry.clone();
    let id = actor_ref.id();
    thread::spawn(move || {
        if let Err(err) = actor.pre_start(&mut ctx) {
            let _ = err;
            actor.post_stop(&ExitReason::UNHANDLED_EXCEPTION);
            registry_for_thread.notify_termination(id, &ExitReason::UNHANDLED_EXCEPTION);
            return;
        }
        if let Some(reason) = ctx.take_planned_exit() {
            actor.post_stop(&reason);
            registry_for_thread.notify_termination(id, &reason);
            return;
        }

        actor.run(&mut ctx);

        let reason = ctx.take_planned_exit().unwrap_or(ExitReason::NORMAL);
        actor.post_stop(&reason);
        registry_for_thread.notify_termination(id, &reason);
    });

    actor_ref
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc as StdArc;
    use std::time::Duration as StdDuration;

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Ping,
        Pong(i64),
        Quit,
    }

    impl Message for Msg {
        const MESSAGE_TYPE: &'static str = "blocking_msg";
    }

    #[derive(Debug)]
    struct NoError;

    impl std::fmt::Display for NoError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "no error")
        }
    }
    impl std::error::Error for NoError {}

    struct Counter {
        seen: StdArc<AtomicU32>,
    }

    impl BlockingActor for Counter {
        type Message = Msg;
        type Error = NoError;

        fn run(&mut self, ctx: &mut BlockingActorContext<Self>) {
            let seen = self.seen.clone();
            let mut handlers = Handlers::new().on(move |_actor: &mut Self, msg, ctx| match msg {
                Msg::Ping => {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Some(())
                }
                Msg::Quit => {
                    ctx.quit(ExitReason::NORMAL);
                    Some(())
                }
                Msg::Pong(_) => None,
            });
            ctx.do_receive(self, &mut handlers, || false);
        }
    }

    #[test]
    fn blocking_actor_processes_until_quit() {
        let registry = ActorRegistry::new();
        let seen = StdArc::new(AtomicU32::new(0));
        let actor_ref = spawn_blocking_actor(
            &registry,
            ActorAddress::anonymous(),
            Counter { seen: seen.clone() },
        );

        actor_ref.tell(Msg::Ping);
        actor_ref.tell(Msg::Ping);
        actor_ref.tell(Msg::Quit);

        for _ in 0..200 {
            if seen.load(Ordering::SeqCst) >= 2 && !actor_ref.is_alive() {
                break;
            }
            thread::sleep(StdDuration::from_millis(5));
        }

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!actor_ref.is_alive());
    }

    struct Responder;

    impl BlockingActor for Responder {
        type Message = Msg;
        type Error = NoError;

        fn run(&mut self, ctx: &mut BlockingActorContext<Self>) {
            let mut handlers: Handlers<Self> = Handlers::new().on(|_actor, msg, ctx| match msg {
                Msg::Ping => {
                    ctx.quit(ExitReason::NORMAL);
                    Some(())
                }
                _ => None,
            });
            ctx.receive(self, &mut handlers);
        }
    }

    #[test]
    fn receive_response_times_out_with_no_reply() {
        let registry = ActorRegistry::new();
        let actor_ref = spawn_blocking_actor(&registry, ActorAddress::anonymous(), Responder);

        struct Waiter;
        impl BlockingActor for Waiter {
            type Message = Msg;
            type Error = NoError;
            fn run(&mut self, _ctx: &mut BlockingActorContext<Self>) {}
        }
        let mut waiter = Waiter;
        let (mailbox, self_ref) = registry.spawn_mailbox::<Msg>(ActorAddress::anonymous());
        let parked = StdArc::new((Mutex::new(()), Condvar::new()));
        let mut ctx = BlockingActorContext::new(self_ref, registry.clone(), mailbox, parked);

        let request_id = ctx.request(&actor_ref, |_reply_to| Msg::Pong(0));
        let mut handlers: Handlers<Waiter> = Handlers::new().on(|_actor, msg, _ctx| match msg {
            Msg::Pong(_) => Some(()),
            _ => None,
        });
        let outcome = ctx.receive_response(&mut waiter, request_id, &mut handlers, Some(StdDuration::from_millis(30)));
        assert_eq!(outcome, ResponseOutcome::TimedOut);
    }
}
