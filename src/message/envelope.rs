// Layer 1: Standard library imports
use std::fmt::Debug;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use super::traits::{Message, Priority};
use crate::actor::exit::ExitReason;
use crate::util::ids::{ActorId, MessageId, RequestId};

/// The body of a mailbox envelope.
///
/// §4.1/§4.3 call out four tagged kinds that take dedicated paths
/// through the actor's resume step instead of ordinary `BehaviorStack`
/// dispatch: `exit`, `down`, `response` and `timeout`. A `User` body
/// is the only one that ever reaches a `Behavior`'s clauses — the rest
/// are intercepted earlier (§9's "tagged variants for message kinds").
#[derive(Debug, Clone)]
pub enum EnvelopeBody<M: Message> {
    /// An ordinary application message.
    User(M),
    /// Delivered to a linked peer when the other side of the link
    /// terminates with a non-`normal` reason.
    Exit { from: ActorId, reason: ExitReason },
    /// Delivered to a monitor when the monitored actor terminates.
    Down { who: ActorId, reason: ExitReason },
    /// Synthetic message fired when a behavior frame's timeout elapses
    /// with no matching message dequeued.
    Timeout,
    /// Synthetic message fired when a `request` awaiting this id's
    /// response exceeded its deadline (§7 `request_timeout`).
    RequestTimedOut(RequestId),
}

/// Ordered, reference-counted, immutable tuple of fields routed to an
/// actor's mailbox.
///
/// Clones are cheap (`Arc` clone) and share the same backing storage;
/// the data model's "copy-on-write" guarantee is realized by there
/// being no safe API to mutate a shared envelope in place — callers
/// who need a privately-owned copy to edit use [`Envelope::into_owned`],
/// which clones the body only when more than one handle is live
/// (mirroring `Arc::make_mut`).
#[derive(Debug, Clone)]
pub struct Envelope<M: Message> {
    inner: Arc<EnvelopeInner<M>>,
}

#[derive(Debug)]
struct EnvelopeInner<M: Message> {
    id: MessageId,
    body: EnvelopeBody<M>,
    sender: Option<ActorId>,
    response_id: Option<RequestId>,
    priority: Priority,
    timestamp: DateTime<Utc>,
}

impl<M: Message> Envelope<M> {
    /// Wrap a user payload as a new envelope with default metadata.
    pub fn user(payload: M) -> Self {
        Self::with_body(EnvelopeBody::User(payload))
    }

    /// Build an exit envelope (used by linking, §4.3).
    pub fn exit(from: ActorId, reason: ExitReason) -> Self {
        Self::with_body(EnvelopeBody::Exit { from, reason })
    }

    /// Build a down envelope (used by monitoring, §4.3).
    pub fn down(who: ActorId, reason: ExitReason) -> Self {
        Self::with_body(EnvelopeBody::Down { who, reason })
    }

    /// Build a timeout envelope (used by behavior timeouts, §4.2).
    pub fn timeout() -> Self {
        Self::with_body(EnvelopeBody::Timeout)
    }

    /// Build a request-timeout envelope (used by `request`, §7).
    pub fn request_timed_out(request_id: RequestId) -> Self {
        Self::with_body(EnvelopeBody::RequestTimedOut(request_id))
    }

    fn with_body(body: EnvelopeBody<M>) -> Self {
        Self {
            inner: Arc::new(EnvelopeInner {
                id: MessageId::next(),
                body,
                sender: None,
                response_id: None,
                priority: Priority::Normal,
                timestamp: Utc::now(),
            }),
        }
    }

    /// Attach a sender address, consuming and returning `self` (builder style).
    #[must_use]
    pub fn with_sender(self, sender: ActorId) -> Self {
        self.map_inner(|mut inner| {
            inner.sender = Some(sender);
            inner
        })
    }

    /// Tag this envelope as the response to `request_id`.
    #[must_use]
    pub fn with_response_id(self, request_id: RequestId) -> Self {
        self.map_inner(|mut inner| {
            inner.response_id = Some(request_id);
            inner
        })
    }

    /// Set the delivery priority, consuming and returning `self`.
    #[must_use]
    pub fn with_priority(self, priority: Priority) -> Self {
        self.map_inner(|mut inner| {
            inner.priority = priority;
            inner
        })
    }

    fn map_inner(self, f: impl FnOnce(EnvelopeInner<M>) -> EnvelopeInner<M>) -> Self
    where
        M: Clone,
    {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => EnvelopeInner {
                id: shared.id,
                body: shared.body.clone(),
                sender: shared.sender,
                response_id: shared.response_id,
                priority: shared.priority,
                timestamp: shared.timestamp,
            },
        };
        Self {
            inner: Arc::new(f(inner)),
        }
    }

    /// This envelope's unique id.
    pub fn id(&self) -> MessageId {
        self.inner.id
    }

    /// The envelope's body.
    pub fn body(&self) -> &EnvelopeBody<M> {
        &self.inner.body
    }

    /// The sending actor, if any.
    pub fn sender(&self) -> Option<ActorId> {
        self.inner.sender
    }

    /// The request this envelope answers, if it is a response.
    pub fn response_id(&self) -> Option<RequestId> {
        self.inner.response_id
    }

    /// The envelope's priority class.
    pub fn priority(&self) -> Priority {
        self.inner.priority
    }

    /// When this envelope was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.inner.timestamp
    }

    /// Borrow the user payload, if this is a `User` envelope.
    pub fn as_user(&self) -> Option<&M> {
        match &self.inner.body {
            EnvelopeBody::User(m) => Some(m),
            _ => None,
        }
    }

    /// Clone out an owned copy of the body, cloning storage only if it
    /// is currently shared with another handle.
    pub fn into_owned(self) -> EnvelopeBody<M> {
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner.body,
            Err(shared) => shared.body.clone(),
        }
    }
}
