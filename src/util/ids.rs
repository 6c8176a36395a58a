// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Unique identifier for actors in the system.
///
/// Per the data model, an `ActorId` is a monotonically-increasing
/// 64-bit integer, unique within the lifetime of the process. It is
/// never reused, even after the actor it named has terminated and been
/// deregistered.
///
/// # Example
/// ```rust
/// use fluxion::util::ActorId;
///
/// let id1 = ActorId::next();
/// let id2 = ActorId::next();
/// assert!(id2.as_u64() > id1.as_u64());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(u64);

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

impl ActorId {
    /// Allocate the next process-wide unique actor id.
    pub fn next() -> Self {
        Self(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Reconstruct an id from a raw value (used by the registry on lookup).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The underlying integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a single message instance.
///
/// Used for tracing and monitoring; distinct from `RequestId`, which
/// correlates a request with its eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

impl MessageId {
    /// Allocate the next process-wide unique message id.
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The underlying integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Correlates a `request(...)` call with the response that answers it.
///
/// `RequestId`s are scoped to the requesting actor: each actor owns an
/// internal counter (see `actor::cell::ActorCell`) and hands out fresh
/// ids from it, so two different actors may reuse the same numeric
/// value without confusion — responses are only ever matched within
/// the owning actor's own `pending_responses` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw counter value handed out by an `ActorCell`.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The underlying integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Actor address for message routing.
///
/// Supports both named and anonymous actors: named actors can be
/// discovered through the registry by name, anonymous actors only by
/// their id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorAddress {
    /// Named actor with a string identifier in addition to its id.
    Named { id: ActorId, name: String },
    /// Anonymous actor, addressable only by id.
    Anonymous { id: ActorId },
}

impl ActorAddress {
    /// Create a new named actor address with a freshly allocated id.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            id: ActorId::next(),
            name: name.into(),
        }
    }

    /// Create a new anonymous actor address with a freshly allocated id.
    pub fn anonymous() -> Self {
        Self::Anonymous { id: ActorId::next() }
    }

    /// The actor id, regardless of whether the address is named.
    pub fn id(&self) -> ActorId {
        match self {
            Self::Named { id, .. } => *id,
            Self::Anonymous { id } => *id,
        }
    }

    /// The actor's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Anonymous { .. } => None,
        }
    }
}

impl Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { id, name } => write!(f, "{name}{id}"),
            Self::Anonymous { id } => write!(f, "anonymous{id}"),
        }
    }
}
