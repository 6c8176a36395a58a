// Layer 1: Standard library imports
use std::fmt::Debug;

// Layer 2: Third-party crate imports
// (none for this module)

// Layer 3: Internal module imports
// (none yet)

/// Marker trait for the set of messages one actor understands.
///
/// A type implementing `Message` is typically an enum whose variants
/// carry the "dynamically-typed tuple of fields" the data model
/// describes — e.g. `Arith::Plus(i64, i64)` — matched inside a
/// [`crate::actor::behavior::Behavior`]'s clauses the way an Erlang
/// `receive` block matches tuple shapes.
///
/// # Example
/// ```rust
/// use fluxion::message::Message;
///
/// #[derive(Debug, Clone)]
/// enum Arith {
///     Plus(i64, i64),
///     Minus(i64, i64),
///     Result(i64),
/// }
///
/// impl Message for Arith {
///     const MESSAGE_TYPE: &'static str = "arith";
/// }
/// ```
pub trait Message: Send + Sync + Clone + Debug + 'static {
    /// Human-readable type tag, primarily for monitoring events.
    const MESSAGE_TYPE: &'static str;
}

/// Priority class used by the mailbox's dual-region queue.
///
/// Per §4.1, there are exactly two classes: messages enqueued as
/// `High` bypass any `Normal` messages already queued, but ordering
/// *within* a class is always FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Ordinary application traffic.
    Normal,
    /// Bypasses normal-priority messages already queued.
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}
