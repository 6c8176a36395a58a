//! One-shot termination callbacks (§4.3 "attachables").
//!
//! Unlike links and monitors, which are cross-actor relationships kept
//! in [`crate::broker::registry::ActorRegistry`], an attachable fires
//! locally: it is invoked by the actor's own cell as the last step of
//! its own teardown, with no registry involvement.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::exit::ExitReason;

/// A callback invoked exactly once, when the owning actor terminates.
pub type Attachable = Box<dyn FnOnce(&ExitReason) + Send>;

/// The set of attachables registered on one actor.
#[derive(Default)]
pub struct AttachableSet {
    callbacks: Vec<Attachable>,
}

impl AttachableSet {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: Attachable) {
        self.callbacks.push(callback);
    }

    /// Fire every registered callback, in registration order, then
    /// leave the set empty.
    pub fn fire_all(&mut self, reason: &ExitReason) {
        for callback in self.callbacks.drain(..) {
            callback(reason);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
