//! The actor registry: a lock-free control plane for exit/down
//! delivery, name resolution, and link/monitor bookkeeping.
//!
//! Ordinary message delivery never touches this registry — a sender
//! that holds an [`crate::actor::reference::ActorRef<M>`] already has
//! a directly-callable, strongly-typed [`crate::mailbox::MailboxSender<M>`].
//! The registry exists only for the things that are inherently
//! type-erased: "does this `ActorId` still exist", "who is linked to
//! it", "who monitors it" — the control-plane concerns of §4.3/§4.9.

// Layer 1: Standard library imports
use std::collections::HashSet;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::actor::exit::ExitReason;
use crate::actor::reference::ActorRef;
use crate::mailbox::{self, MailboxSender};
use crate::message::{Envelope, Message, Priority};
use crate::util::ids::{ActorAddress, ActorId};

/// Type-erased control handle for an actor's mailbox: enough to
/// deliver an `Exit`/`Down` envelope or check liveness, without
/// knowing the actor's message type.
pub trait ActorControl: Send + Sync {
    fn deliver_exit(&self, from: ActorId, reason: ExitReason);
    fn deliver_down(&self, who: ActorId, reason: ExitReason);
    fn is_closed(&self) -> bool;
}

struct ControlHandle<M: Message> {
    sender: MailboxSender<M>,
}

impl<M: Message> ActorControl for ControlHandle<M> {
    fn deliver_exit(&self, from: ActorId, reason: ExitReason) {
        let _ = self
            .sender
            .enqueue(Envelope::exit(from, reason).with_priority(Priority::High));
    }

    fn deliver_down(&self, who: ActorId, reason: ExitReason) {
        let _ = self
            .sender
            .enqueue(Envelope::down(who, reason).with_priority(Priority::High));
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Process-wide (or system-wide) table of live actors plus their link
/// and monitor relationships.
#[derive(Clone)]
pub struct ActorRegistry {
    controls: Arc<DashMap<ActorId, Arc<dyn ActorControl>>>,
    names: Arc<DashMap<String, ActorId>>,
    links: Arc<DashMap<ActorId, HashSet<ActorId>>>,
    monitors: Arc<DashMap<ActorId, HashSet<ActorId>>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self {
            controls: Arc::new(DashMap::new()),
            names: Arc::new(DashMap::new()),
            links: Arc::new(DashMap::new()),
            monitors: Arc::new(DashMap::new()),
        }
    }

    /// Build a mailbox for a new actor and register it, returning the
    /// receiving half plus a typed reference others can send through.
    pub fn spawn_mailbox<M: Message>(&self, address: ActorAddress) -> (mailbox::Mailbox<M>, ActorRef<M>) {
        let (mailbox, sender) = mailbox::channel::<M>();
        let control = self.register(&address, sender.clone());
        let actor_ref = ActorRef::new(address, sender, control);
        (mailbox, actor_ref)
    }

    fn register<M: Message>(&self, address: &ActorAddress, sender: MailboxSender<M>) -> Arc<dyn ActorControl> {
        let control: Arc<dyn ActorControl> = Arc::new(ControlHandle { sender });
        self.controls.insert(address.id(), control.clone());
        if let Some(name) = address.name() {
            self.names.insert(name.to_string(), address.id());
        }
        control
    }

    pub fn control(&self, id: ActorId) -> Option<Arc<dyn ActorControl>> {
        self.controls.get(&id).map(|entry| entry.clone())
    }

    pub fn resolve_name(&self, name: &str) -> Option<ActorId> {
        self.names.get(name).map(|entry| *entry)
    }

    /// Record a bidirectional link between two actors (§4.3).
    pub fn link(&self, a: ActorId, b: ActorId) {
        self.links.entry(a).or_default().insert(b);
        self.links.entry(b).or_default().insert(a);
    }

    pub fn unlink(&self, a: ActorId, b: ActorId) {
        if let Some(mut peers) = self.links.get_mut(&a) {
            peers.remove(&b);
        }
        if let Some(mut peers) = self.links.get_mut(&b) {
            peers.remove(&a);
        }
    }

    /// Record a unidirectional monitor: `observer` will receive a
    /// `Down` message when `target` terminates.
    pub fn monitor(&self, observer: ActorId, target: ActorId) {
        self.monitors.entry(target).or_default().insert(observer);
    }

    pub fn demonitor(&self, observer: ActorId, target: ActorId) {
        if let Some(mut observers) = self.monitors.get_mut(&target) {
            observers.remove(&observer);
        }
    }

    /// Called once by the terminating actor's cell as the last step of
    /// teardown: fans `reason` out to linked peers (unless `normal`)
    /// and to every monitor (always), then removes `id` from the
    /// registry entirely.
    pub fn notify_termination(&self, id: ActorId, reason: &ExitReason) {
        if !reason.is_normal() {
            if let Some((_, peers)) = self.links.remove(&id) {
                for peer in peers {
                    if let Some(mut peer_links) = self.links.get_mut(&peer) {
                        peer_links.remove(&id);
                    }
                    if let Some(control) = self.control(peer) {
                        control.deliver_exit(id, reason.clone());
                    }
                }
            }
        } else {
            self.links.remove(&id);
        }

        if let Some((_, observers)) = self.monitors.remove(&id) {
            for observer in observers {
                if let Some(control) = self.control(observer) {
                    control.deliver_down(id, reason.clone());
                }
            }
        }

        self.controls.remove(&id);
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping;

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[test]
    fn linked_actors_receive_exit_on_abnormal_termination() {
        let registry = ActorRegistry::new();
        let (mailbox_a, actor_a) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        let (_mailbox_b, actor_b) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        registry.link(actor_a.id(), actor_b.id());

        registry.notify_termination(actor_b.id(), &ExitReason::UNHANDLED_EXCEPTION);

        let envelope = mailbox_a.try_dequeue().expect("exit envelope delivered");
        assert!(matches!(
            envelope.body(),
            crate::message::EnvelopeBody::Exit { .. }
        ));
    }

    #[test]
    fn normal_termination_does_not_propagate_across_links() {
        let registry = ActorRegistry::new();
        let (mailbox_a, actor_a) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        let (_mailbox_b, actor_b) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        registry.link(actor_a.id(), actor_b.id());

        registry.notify_termination(actor_b.id(), &ExitReason::NORMAL);

        assert!(mailbox_a.try_dequeue().is_none());
    }

    #[test]
    fn monitors_always_receive_down() {
        let registry = ActorRegistry::new();
        let (mailbox_a, actor_a) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        let (_mailbox_b, actor_b) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        registry.monitor(actor_a.id(), actor_b.id());

        registry.notify_termination(actor_b.id(), &ExitReason::NORMAL);

        let envelope = mailbox_a.try_dequeue().expect("down envelope delivered");
        assert!(matches!(
            envelope.body(),
            crate::message::EnvelopeBody::Down { .. }
        ));
    }

    #[test]
    fn resolve_name_finds_named_actors() {
        let registry = ActorRegistry::new();
        let address = ActorAddress::named("worker-1");
        let (_mailbox, actor_ref) = registry.spawn_mailbox::<Ping>(address);
        assert_eq!(registry.resolve_name("worker-1"), Some(actor_ref.id()));
    }

    #[test]
    fn deregistered_actor_is_not_resolvable() {
        let registry = ActorRegistry::new();
        let (_mailbox, actor_ref) = registry.spawn_mailbox::<Ping>(ActorAddress::anonymous());
        registry.notify_termination(actor_ref.id(), &ExitReason::NORMAL);
        assert!(registry.control(actor_ref.id()).is_none());
    }
}
