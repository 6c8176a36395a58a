//! The dual-priority FIFO queue behind every actor's mailbox.
//!
//! Per §4.1, a mailbox is an ordered queue split into two regions —
//! `high` and `normal` — with strict FIFO ordering *within* a region.
//! Dequeue always drains `high` before `normal`. The queue itself knows
//! nothing about actor scheduling; the suspend/resume double-check
//! protocol lives in [`crate::actor::cell`], which pairs a `Mailbox`
//! with the actor's shared [`crate::actor::state::SharedActorState`].

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::error::MailboxError;
use crate::message::{Envelope, Message, Priority};

/// Called after an enqueue lands on a mailbox whose actor may be
/// `blocked`. Installed by a scheduler (§4.1's "the enqueuer
/// atomically transitions it to ready and hands it to the scheduler");
/// a mailbox with no installed waker just queues the envelope.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

struct Shared<M: Message> {
    high: Mutex<VecDeque<Envelope<M>>>,
    normal: Mutex<VecDeque<Envelope<M>>>,
    closed: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

/// The receiving half of a mailbox. Owned exclusively by the actor
/// resume loop; never cloned or shared across threads concurrently.
pub struct Mailbox<M: Message> {
    shared: Arc<Shared<M>>,
}

/// The sending half of a mailbox. Cheap to clone; every [`crate::actor::reference::ActorRef`]
/// holds one.
#[derive(Clone)]
pub struct MailboxSender<M: Message> {
    shared: Arc<Shared<M>>,
}

/// Create a fresh, open mailbox and its sender.
pub fn channel<M: Message>() -> (Mailbox<M>, MailboxSender<M>) {
    let shared = Arc::new(Shared {
        high: Mutex::new(VecDeque::new()),
        normal: Mutex::new(VecDeque::new()),
        closed: AtomicBool::new(false),
        waker: Mutex::new(None),
    });
    (
        Mailbox {
            shared: shared.clone(),
        },
        MailboxSender { shared },
    )
}

impl<M: Message> Mailbox<M> {
    /// Pop the next envelope in priority order: all of `high` drains
    /// before any of `normal` is considered.
    pub fn try_dequeue(&self) -> Option<Envelope<M>> {
        if let Some(envelope) = self.shared.high.lock().pop_front() {
            return Some(envelope);
        }
        self.shared.normal.lock().pop_front()
    }

    /// Whether both regions are currently empty.
    pub fn is_empty(&self) -> bool {
        self.shared.high.lock().is_empty() && self.shared.normal.lock().is_empty()
    }

    /// Push an envelope back onto the head of its own priority class
    /// (§4.2's default "skip" policy: a message no behavior frame
    /// matches is put back rather than dropped). Does not consult
    /// `closed` — an envelope already inside the mailbox is allowed
    /// back in even after `close()`.
    pub fn requeue_front(&self, envelope: Envelope<M>) {
        let region = match envelope.priority() {
            Priority::High => &self.shared.high,
            Priority::Normal => &self.shared.normal,
        };
        region.lock().push_front(envelope);
    }

    /// Total envelopes currently queued across both regions.
    pub fn len(&self) -> usize {
        self.shared.high.lock().len() + self.shared.normal.lock().len()
    }

    /// Stop accepting new envelopes. Already-queued envelopes remain
    /// dequeueable so a terminating actor can still drain its mailbox
    /// if its resume loop chooses to.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Install the callback a scheduler runs after an enqueue, so a
    /// `blocked` actor can be handed back to the ready queue (§4.1).
    /// Replaces any previously installed waker.
    pub fn set_waker(&self, waker: Waker) {
        *self.shared.waker.lock() = Some(waker);
    }
}

impl<M: Message> MailboxSender<M> {
    /// Enqueue an envelope. Per §4.1, a closed mailbox silently
    /// discards the message rather than erroring the sender — the
    /// sender usually cannot act on the failure anyway, since the
    /// target has already torn down.
    pub fn enqueue(&self, envelope: Envelope<M>) -> Result<(), MailboxError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(MailboxError::Closed);
        }
        let region = match envelope.priority() {
            Priority::High => &self.shared.high,
            Priority::Normal => &self.shared.normal,
        };
        region.lock().push_back(envelope);
        if let Some(waker) = self.shared.waker.lock().as_ref() {
            waker();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Num(i64);

    impl Message for Num {
        const MESSAGE_TYPE: &'static str = "num";
    }

    #[test]
    fn fifo_within_a_region() {
        let (mailbox, sender) = channel::<Num>();
        sender.enqueue(Envelope::user(Num(1))).unwrap();
        sender.enqueue(Envelope::user(Num(2))).unwrap();
        assert_eq!(mailbox.try_dequeue().unwrap().as_user(), Some(&Num(1)));
        assert_eq!(mailbox.try_dequeue().unwrap().as_user(), Some(&Num(2)));
    }

    #[test]
    fn high_priority_bypasses_normal() {
        let (mailbox, sender) = channel::<Num>();
        sender.enqueue(Envelope::user(Num(1))).unwrap();
        sender
            .enqueue(Envelope::user(Num(2)).with_priority(Priority::High))
            .unwrap();
        assert_eq!(mailbox.try_dequeue().unwrap().as_user(), Some(&Num(2)));
        assert_eq!(mailbox.try_dequeue().unwrap().as_user(), Some(&Num(1)));
    }

    #[test]
    fn closed_mailbox_discards_sends() {
        let (mailbox, sender) = channel::<Num>();
        mailbox.close();
        assert_eq!(
            sender.enqueue(Envelope::user(Num(1))),
            Err(MailboxError::Closed)
        );
        assert!(mailbox.is_empty());
    }

    #[test]
    fn empty_and_len_reflect_queue_state() {
        let (mailbox, sender) = channel::<Num>();
        assert!(mailbox.is_empty());
        sender.enqueue(Envelope::user(Num(1))).unwrap();
        assert_eq!(mailbox.len(), 1);
        assert!(!mailbox.is_empty());
    }
}
