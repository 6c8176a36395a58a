//! `AsyncBuffer<T>`: the bounded, single-producer/single-consumer ring
//! buffer that bridges two `Coordinator`s (§3, §4.6) — what
//! `observe_on` uses to hand items from one actor's flow to another's.
//!
//! Resources are single-use openings (`try_open`): a
//! [`ConsumerResource`]/[`ProducerResource`] pair hands out the shared
//! buffer pointer exactly once each, modeling `from_resource`'s
//! "already opened" failure mode (§4.8) at the type level.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::error::FlowError;

/// What happens first when both data and a terminal signal are
/// pending: drain buffered items before the terminal (`DrainFirst`,
/// the default), or surface a pending error immediately
/// (`PrioritizeErrors`) even if items remain unconsumed (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    DrainFirst,
    PrioritizeErrors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Complete,
    Error,
}

struct Shared<T> {
    capacity: usize,
    min_request_size: usize,
    queue: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    terminal: Mutex<Option<Terminal>>,
    error: Mutex<Option<FlowError>>,
    producer_waker: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    consumer_waker: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    consumer_cancelled: AtomicBool,
}

impl<T> Shared<T> {
    fn wake_consumer(&self) {
        if let Some(waker) = self.consumer_waker.lock().as_ref() {
            waker();
        }
    }

    fn wake_producer(&self) {
        if let Some(waker) = self.producer_waker.lock().as_ref() {
            waker();
        }
    }
}

/// The producer half: one writer.
pub struct AsyncProducer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AsyncProducer<T> {
    /// Cheap: clones the `Arc` handle, not the buffer. Lets a caller
    /// (e.g. `observe_on`'s demand-replenishing waker) hold a second
    /// handle onto the same producer without taking ownership of the
    /// original.
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// The consumer half: one reader.
pub struct AsyncConsumer<T> {
    shared: Arc<Shared<T>>,
}

/// Construct a bounded SPSC buffer directly (bypassing the
/// single-open resource wrappers below), returning the consumer half
/// first, then the producer half, matching
/// `make_spsc_buffer_resource`'s return order (§4.6).
pub fn channel<T>(capacity: usize, min_request_size: usize) -> (AsyncConsumer<T>, AsyncProducer<T>) {
    let shared = Arc::new(Shared {
        capacity: capacity.max(1),
        min_request_size,
        queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        closed: AtomicBool::new(false),
        terminal: Mutex::new(None),
        error: Mutex::new(None),
        producer_waker: Mutex::new(None),
        consumer_waker: Mutex::new(None),
        consumer_cancelled: AtomicBool::new(false),
    });
    (
        AsyncConsumer {
            shared: shared.clone(),
        },
        AsyncProducer { shared },
    )
}

impl<T> AsyncProducer<T> {
    /// Install the callback run when space frees up or the buffer
    /// closes — used by a blocking producer to know when to retry.
    pub fn set_waker(&self, waker: Arc<dyn Fn() + Send + Sync>) {
        *self.shared.producer_waker.lock() = Some(waker);
    }

    /// Push one item. Returns `false` if the buffer is closed or full
    /// (non-blocking variant — §4.6's plain `push`).
    pub fn push(&self, item: T) -> bool {
        if self.shared.closed.load(Ordering::Acquire) || self.shared.consumer_cancelled.load(Ordering::Acquire)
        {
            return false;
        }
        let mut queue = self.shared.queue.lock();
        if queue.len() >= self.shared.capacity {
            return false;
        }
        queue.push_back(item);
        let should_wake = queue.len() >= self.shared.min_request_size.max(1);
        drop(queue);
        if should_wake {
            self.shared.wake_consumer();
        }
        true
    }

    /// Block (busy-wait, yielding the thread) until `item` is accepted
    /// or the buffer closes. Returns `false` only if closed before the
    /// push could land (§4.6's `blocking_producer`).
    pub fn blocking_push(&self, mut item: T) -> bool {
        loop {
            if self.shared.closed.load(Ordering::Acquire)
                || self.shared.consumer_cancelled.load(Ordering::Acquire)
            {
                return false;
            }
            match self.try_push_owned(item) {
                Ok(()) => return true,
                Err(rejected) => {
                    item = rejected;
                    std::thread::yield_now();
                }
            }
        }
    }

    fn try_push_owned(&self, item: T) -> Result<(), T> {
        let mut queue = self.shared.queue.lock();
        if queue.len() >= self.shared.capacity {
            return Err(item);
        }
        queue.push_back(item);
        let should_wake = queue.len() >= self.shared.min_request_size.max(1);
        drop(queue);
        if should_wake {
            self.shared.wake_consumer();
        }
        Ok(())
    }

    /// Close cleanly: the consumer observes `on_complete` once
    /// buffered items have drained.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.shared.terminal.lock() = Some(Terminal::Complete);
        self.shared.wake_consumer();
    }

    /// Close with an error: the consumer observes `on_error` once
    /// buffered items have drained (or immediately under
    /// `PullPolicy::PrioritizeErrors`).
    pub fn close_with_error(&self, error: FlowError) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.shared.error.lock() = Some(error);
        *self.shared.terminal.lock() = Some(Terminal::Error);
        self.shared.wake_consumer();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Whether the consumer has cancelled — a producer should stop
    /// generating once this is true.
    pub fn is_cancelled(&self) -> bool {
        self.shared.consumer_cancelled.load(Ordering::Acquire)
    }

    /// How many items currently sit in the buffer, unconsumed. Lets a
    /// producer-side caller (e.g. `observe_on`) size its next upstream
    /// demand request without needing the consumer half.
    pub fn buffered_len(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

/// What one `pull` call delivered.
pub enum PullOutcome<T> {
    /// `items` delivered; more may follow.
    Items(Vec<T>),
    /// The source completed; `items` holds any final buffered batch.
    Complete(Vec<T>),
    /// The source failed; `items` holds any final buffered batch.
    Error(Vec<T>, FlowError),
}

impl<T> AsyncConsumer<T> {
    /// Install the callback run when buffered items reach
    /// `min_request_size`, the buffer closes, or (per §4.6) explicit
    /// demand otherwise needs the producer's attention.
    pub fn set_waker(&self, waker: Arc<dyn Fn() + Send + Sync>) {
        *self.shared.consumer_waker.lock() = Some(waker);
    }

    /// Deliver up to `n` items per `policy` (§4.6). Never blocks —
    /// returns `Items(vec![])` if nothing is ready yet.
    pub fn pull(&self, policy: PullPolicy, n: usize) -> PullOutcome<T> {
        if matches!(policy, PullPolicy::PrioritizeErrors) {
            if let Some(Terminal::Error) = *self.shared.terminal.lock() {
                let drained = self.drain(n);
                if let Some(error) = self.shared.error.lock().take() {
                    return PullOutcome::Error(drained, error);
                }
            }
        }

        let drained = self.drain(n);
        if !drained.is_empty() {
            return PullOutcome::Items(drained);
        }

        match *self.shared.terminal.lock() {
            Some(Terminal::Complete) => PullOutcome::Complete(Vec::new()),
            Some(Terminal::Error) => {
                let error = self
                    .shared
                    .error
                    .lock()
                    .take()
                    .unwrap_or_else(|| FlowError::RuntimeError("buffer closed with unknown error".into()));
                PullOutcome::Error(Vec::new(), error)
            }
            None => PullOutcome::Items(Vec::new()),
        }
    }

    fn drain(&self, n: usize) -> Vec<T> {
        let mut queue = self.shared.queue.lock();
        let count = n.min(queue.len());
        let drained: Vec<T> = queue.drain(..count).collect();
        let had_space_before = queue.len() + count >= self.shared.capacity;
        drop(queue);
        if had_space_before && count > 0 {
            self.shared.wake_producer();
        }
        drained
    }

    /// Cancel from the consumer side: the producer should observe
    /// `is_cancelled()` and stop; no further items are delivered.
    pub fn cancel(&self) {
        self.shared.consumer_cancelled.store(true, Ordering::Release);
        self.shared.wake_producer();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

/// A single-use opening for the consumer half (§4.6
/// `make_spsc_buffer_resource`). A second `try_open` call fails —
/// this is what `from_resource` surfaces as `FlowError::InvalidObservable`.
#[derive(Clone)]
pub struct ConsumerResource<T> {
    consumer: Arc<Mutex<Option<AsyncConsumer<T>>>>,
}

/// A single-use opening for the producer half.
#[derive(Clone)]
pub struct ProducerResource<T> {
    producer: Arc<Mutex<Option<AsyncProducer<T>>>>,
}

/// Build a bounded SPSC buffer as a pair of single-use resources
/// (§4.6). Returns `(consumer_resource, producer_resource)`.
pub fn make_spsc_buffer_resource<T>(
    capacity: usize,
    min_request_size: usize,
) -> (ConsumerResource<T>, ProducerResource<T>) {
    let (consumer, producer) = channel(capacity, min_request_size);
    (
        ConsumerResource {
            consumer: Arc::new(Mutex::new(Some(consumer))),
        },
        ProducerResource {
            producer: Arc::new(Mutex::new(Some(producer))),
        },
    )
}

impl<T> ConsumerResource<T> {
    /// Hand out the consumer exactly once; a second call returns
    /// `None`.
    pub fn try_open(&self) -> Option<AsyncConsumer<T>> {
        self.consumer.lock().take()
    }

    pub fn is_opened(&self) -> bool {
        self.consumer.lock().is_none()
    }
}

impl<T> ProducerResource<T> {
    pub fn try_open(&self) -> Option<AsyncProducer<T>> {
        self.producer.lock().take()
    }

    pub fn is_opened(&self) -> bool {
        self.producer.lock().is_none()
    }
}
