//! Typed handles to a running actor's mailbox.
//!
//! An [`ActorRef<M>`] is what one actor holds to talk to another: a
//! cheap-to-clone pair of an [`ActorId`]/[`ActorAddress`] and the
//! strongly-typed [`MailboxSender<M>`] that accepts that actor's
//! message type. Message delivery (`tell`) never goes through a
//! type-erased registry lookup — only the control-plane operations
//! (link, monitor, exit propagation) do, via [`crate::broker::registry::ActorControl`].

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::broker::registry::ActorControl;
use crate::mailbox::MailboxSender;
use crate::message::{Envelope, Message, Priority};
use crate::util::ids::{ActorAddress, ActorId, RequestId};

/// A typed, cloneable reference to another actor's mailbox.
#[derive(Clone)]
pub struct ActorRef<M: Message> {
    id: ActorId,
    address: ActorAddress,
    sender: MailboxSender<M>,
    control: Arc<dyn ActorControl>,
    priority_aware: bool,
}

impl<M: Message> ActorRef<M> {
    pub fn new(address: ActorAddress, sender: MailboxSender<M>, control: Arc<dyn ActorControl>) -> Self {
        Self {
            id: address.id(),
            address,
            sender,
            control,
            priority_aware: true,
        }
    }

    /// Mark whether this target actor was spawned with the
    /// `priority_aware` capability (§6). `tell_priority` downgrades to
    /// normal priority for targets that were not.
    #[must_use]
    pub(crate) fn with_priority_aware(mut self, priority_aware: bool) -> Self {
        self.priority_aware = priority_aware;
        self
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    /// Fire-and-forget send at normal priority.
    pub fn tell(&self, message: M) {
        let _ = self.sender.enqueue(Envelope::user(message));
    }

    /// Fire-and-forget send that jumps ahead of normal-priority traffic.
    /// Silently downgrades to normal priority if this target was not
    /// spawned with `SpawnOptions::priority_aware()` (§6).
    pub fn tell_priority(&self, message: M) {
        let priority = if self.priority_aware {
            Priority::High
        } else {
            Priority::Normal
        };
        let _ = self.sender.enqueue(Envelope::user(message).with_priority(priority));
    }

    /// Send tagged as the reply to `request_id`, from `sender`.
    pub(crate) fn tell_response(&self, message: M, sender: ActorId, request_id: RequestId) {
        let _ = self.sender.enqueue(
            Envelope::user(message)
                .with_sender(sender)
                .with_response_id(request_id),
        );
    }

    /// Whether this actor's mailbox is known to have been closed.
    pub fn is_alive(&self) -> bool {
        !self.control.is_closed()
    }

    pub(crate) fn control(&self) -> &Arc<dyn ActorControl> {
        &self.control
    }
}

/// A handle embedded in a request message so the recipient can answer
/// back through the requester's own mailbox, without either side
/// needing a type-erased "any message" channel.
///
/// Mirrors the `tokio::sync::oneshot::Sender<T>` pattern, generalized
/// to route back through the requester's ordinary behavior dispatch
/// (so the reply is still processed one-at-a-time like any other
/// message) instead of a bare one-shot channel.
#[derive(Clone)]
pub struct ReplyTo<M: Message> {
    target: ActorRef<M>,
    from: ActorId,
    request_id: RequestId,
}

impl<M: Message> ReplyTo<M> {
    pub(crate) fn new(target: ActorRef<M>, from: ActorId, request_id: RequestId) -> Self {
        Self {
            target,
            from,
            request_id,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Deliver the reply. Per §7, replying to a requester that has
    /// since terminated is not an error here — the envelope is simply
    /// discarded by the now-closed mailbox.
    pub fn reply(&self, message: M) {
        self.target.tell_response(message, self.from, self.request_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::broker::registry::ActorRegistry;
    use crate::message::Message;

    #[derive(Debug, Clone, PartialEq)]
    struct Num(i64);

    impl Message for Num {
        const MESSAGE_TYPE: &'static str = "num";
    }

    #[test]
    fn tell_delivers_into_the_mailbox() {
        let registry = ActorRegistry::new();
        let (mailbox, actor_ref) = registry.spawn_mailbox::<Num>(ActorAddress::anonymous());
        actor_ref.tell(Num(42));
        assert_eq!(mailbox.try_dequeue().unwrap().as_user(), Some(&Num(42)));
    }

    #[test]
    fn reply_to_routes_back_with_request_id() {
        let registry = ActorRegistry::new();
        let (requester_mailbox, requester_ref) =
            registry.spawn_mailbox::<Num>(ActorAddress::anonymous());
        let request_id = RequestId::from_raw(7);
        let reply_to = ReplyTo::new(requester_ref.clone(), requester_ref.id(), request_id);
        reply_to.reply(Num(99));
        let envelope = requester_mailbox.try_dequeue().unwrap();
        assert_eq!(envelope.response_id(), Some(request_id));
        assert_eq!(envelope.as_user(), Some(&Num(99)));
    }
}
