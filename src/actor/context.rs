//! `ActorContext`: the handle a running actor uses to talk back to the
//! rest of the system — sending, requesting, linking, monitoring,
//! becoming a different behavior, and quitting.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration as StdDuration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Duration as ChronoDuration, Utc};

// Layer 3: Internal module imports
use super::attachable::{Attachable, AttachableSet};
use super::behavior::{BecomePolicy, Behavior, Transition};
use super::exit::ExitReason;
use super::reference::{ActorRef, ReplyTo};
use super::traits::Actor;
use crate::broker::registry::ActorRegistry;
use crate::message::Message;
use crate::util::ids::{ActorAddress, ActorId, RequestId};

/// Bookkeeping for one outstanding `request`. The deadline, if any, is
/// swept by `ActorCell::check_request_timeouts` on every resume step.
struct PendingRequest {
    deadline: Option<DateTime<Utc>>,
}

/// The context passed to every `Behavior` clause and lifecycle hook.
///
/// Long-lived: one `ActorContext` is created when an actor is spawned
/// and handed to it, by mutable reference, for the rest of its life.
pub struct ActorContext<A: Actor> {
    id: ActorId,
    address: ActorAddress,
    created_at: DateTime<Utc>,
    self_ref: ActorRef<A::Message>,
    registry: ActorRegistry,
    trap_exit: bool,
    attachables: AttachableSet,
    pending: HashMap<RequestId, PendingRequest>,
    next_request_id: u64,
    transition: Option<Transition<A>>,
    planned_exit: Option<ExitReason>,
    current_sender: Option<ActorId>,
    current_response_id: Option<RequestId>,
}

impl<A: Actor> ActorContext<A> {
    pub fn new(self_ref: ActorRef<A::Message>, registry: ActorRegistry) -> Self {
        Self {
            id: self_ref.id(),
            address: self_ref.address().clone(),
            created_at: Utc::now(),
            self_ref,
            registry,
            trap_exit: false,
            attachables: AttachableSet::new(),
            pending: HashMap::new(),
            next_request_id: 1,
            transition: None,
            planned_exit: None,
            current_sender: None,
            current_response_id: None,
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

    /// A cloneable handle to this actor's own mailbox, for embedding
    /// in request payloads as a `ReplyTo` target.
    pub fn self_ref(&self) -> ActorRef<A::Message> {
        self.self_ref.clone()
    }

    /// The sender of the envelope currently being dispatched, if any.
    pub fn sender(&self) -> Option<ActorId> {
        self.current_sender
    }

    /// The request id the current envelope answers, if it is a reply.
    pub fn response_id(&self) -> Option<RequestId> {
        self.current_response_id
    }

    pub(crate) fn set_current_envelope_meta(
        &mut self,
        sender: Option<ActorId>,
        response_id: Option<RequestId>,
    ) {
        self.current_sender = sender;
        self.current_response_id = response_id;
    }

    /// Send a fire-and-forget message to `target`.
    pub fn send<M: Message>(&self, target: &ActorRef<M>, message: M) {
        target.tell(message);
    }

    /// Send a message and register a `ReplyTo` handle the recipient
    /// can use to answer through this actor's own mailbox.
    ///
    /// `build` receives the `ReplyTo` to embed in the request payload
    /// and returns the payload itself; `timeout`, if set, causes a
    /// `RequestTimedOut` envelope to arrive if no reply lands first.
    pub fn request<M, F>(
        &mut self,
        target: &ActorRef<M>,
        timeout: Option<StdDuration>,
        build: F,
    ) -> RequestId
    where
        M: Message,
        F: FnOnce(ReplyTo<A::Message>) -> M,
    {
        let request_id = self.alloc_request_id();
        let reply_to = ReplyTo::new(self.self_ref(), self.id, request_id);
        let deadline = timeout.map(|d| Utc::now() + ChronoDuration::from_std(d).unwrap_or_default());
        self.pending.insert(request_id, PendingRequest { deadline });
        target.tell(build(reply_to));
        request_id
    }

    /// Mark `request_id` as resolved so it is no longer swept for a timeout.
    pub fn complete_request(&mut self, request_id: RequestId) {
        self.pending.remove(&request_id);
    }

    /// Collect (and clear) every pending request whose deadline has
    /// passed as of `now`, for the cell to turn into
    /// `RequestTimedOut` envelopes.
    pub(crate) fn drain_expired_requests(&mut self, now: DateTime<Utc>) -> Vec<RequestId> {
        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter_map(|(id, pending)| match pending.deadline {
                Some(deadline) if deadline <= now => Some(*id),
                _ => None,
            })
            .collect();
        for id in &expired {
            self.pending.remove(id);
        }
        expired
    }

    /// Clear every outstanding `PendingRequest` and return its id, for
    /// the cell to resolve each with `broken_promise` on termination
    /// (§4.3 shutdown order step 3, §7).
    pub(crate) fn drain_all_pending(&mut self) -> Vec<RequestId> {
        self.pending.drain().map(|(id, _)| id).collect()
    }

    fn alloc_request_id(&mut self) -> RequestId {
        let id = RequestId::from_raw(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    /// Establish a bidirectional link (§4.3): if either side later
    /// terminates with a non-`normal` reason, the other receives `Exit`.
    pub fn link(&self, peer: ActorId) {
        self.registry.link(self.id, peer);
    }

    pub fn unlink(&self, peer: ActorId) {
        self.registry.unlink(self.id, peer);
    }

    /// Watch `target` (§4.3): this actor receives `Down` whenever
    /// `target` terminates, for any reason.
    pub fn monitor(&self, target: ActorId) {
        self.registry.monitor(self.id, target);
    }

    pub fn demonitor(&self, target: ActorId) {
        self.registry.demonitor(self.id, target);
    }

    /// Whether incoming `Exit` envelopes are delivered as ordinary
    /// messages (`true`) instead of immediately terminating this actor
    /// (`false`, the default) — §4.9.
    pub fn trap_exit(&self) -> bool {
        self.trap_exit
    }

    pub fn set_trap_exit(&mut self, trap: bool) {
        self.trap_exit = trap;
    }

    /// Register a one-shot callback fired when this actor terminates.
    pub fn attach(&mut self, callback: Attachable) {
        self.attachables.add(callback);
    }

    pub(crate) fn attachables_mut(&mut self) -> &mut AttachableSet {
        &mut self.attachables
    }

    /// Swap in a new top-level behavior, replacing the current one.
    pub fn become_behavior(&mut self, next: Behavior<A>) {
        self.transition = Some(Transition::Become(next, BecomePolicy::Replace));
    }

    /// Push a new behavior on top, keeping the current one beneath it.
    pub fn become_stacked(&mut self, next: Behavior<A>) {
        self.transition = Some(Transition::Become(next, BecomePolicy::Keep));
    }

    /// Pop the current behavior, returning to whatever was beneath it.
    /// Popping the last frame requests normal termination.
    pub fn unbecome(&mut self) {
        self.transition = Some(Transition::Unbecome);
    }

    pub(crate) fn take_transition(&mut self) -> Option<Transition<A>> {
        self.transition.take()
    }

    /// Request termination with `reason` once the current resume step
    /// finishes. `normal` does not propagate to links; anything else does.
    pub fn quit(&mut self, reason: ExitReason) {
        self.planned_exit = Some(reason);
    }

    pub(crate) fn take_planned_exit(&mut self) -> Option<ExitReason> {
        self.planned_exit.take()
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    /// Build a bare context for unit tests that exercise `Behavior`
    /// dispatch directly without a full `ActorCell`/scheduler.
    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        let registry = ActorRegistry::new();
        let (_mailbox, self_ref) = registry.spawn_mailbox::<A::Message>(ActorAddress::anonymous());
        Self::new(self_ref, registry)
    }
}
