//! The Observable/Observer/Subscription protocol (§4.7) and the
//! pull-based driver most of the operator catalog builds on (§4.8,
//! §9's "duck-typed `Pullable` generator concept").
//!
//! `Observer::on_subscribe` is called exactly once before any item;
//! after `on_complete`/`on_error` no further call reaches the
//! observer. Items delivered via `on_next` never exceed the
//! subscription's total granted demand (§4.7, testable properties
//! 5–6).

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::coordinator::Coordinator;
use super::disposable::{Disposable, DisposableSource};
use super::error::FlowError;
use super::subscription::{DemandCounter, Subscription, SubscriptionImpl};

/// The consumer side of the flow protocol (§4.7).
pub trait Observer<T>: Send {
    /// Called exactly once, before any `on_next`.
    fn on_subscribe(&mut self, subscription: Subscription);

    /// Deliver a contiguous span of items. The total count across all
    /// calls never exceeds the subscription's granted demand.
    fn on_next(&mut self, items: &[T]);

    /// Terminal: the source is exhausted. No further calls follow.
    fn on_complete(&mut self);

    /// Terminal: the source failed. No further calls follow.
    fn on_error(&mut self, error: FlowError);
}

/// A boxed, type-erased observer — what `Observable::subscribe` always
/// receives, since operator chains are built by composing
/// heterogeneous concrete types behind one trait object.
pub type BoxObserver<T> = Box<dyn Observer<T>>;

/// The producer side of the flow protocol (§4.7). Consuming `self` by
/// value means a given `Observable` value can be subscribed to
/// exactly once — re-subscribing to "the same" source requires
/// constructing a fresh one (see `defer`), matching cold-observable
/// semantics (§4.7's "cold unless stated").
pub trait Observable<T>: Send {
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable;
}

pub type BoxObservable<T> = Box<dyn Observable<T>>;

/// Implemented by a pull-based item generator — a "Pullable" in the
/// source vocabulary (§9). `poll` is handed up to `max` units of
/// demand and must call `observer.on_next`/`on_complete`/`on_error`
/// itself; it returns how many items it actually emitted and whether
/// it has now reached a terminal state.
pub trait PullSource<T>: Send {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<T>) -> (u64, bool);
}

struct PullState<T> {
    source: Box<dyn PullSource<T>>,
    observer: Option<BoxObserver<T>>,
}

/// Generic demand-driven driver: on `request(n)`, schedules itself
/// onto the coordinator to pull up to `batch` items at a time until
/// demand is exhausted or the source reaches a terminal state. Shared
/// by every synchronous generator in `operators::sources` and reused
/// by `take`/`filter`/etc., which wrap an upstream `PullSource`.
struct PullDriver<T> {
    coordinator: Coordinator,
    state: Mutex<PullState<T>>,
    demand: DemandCounter,
    scheduled: AtomicBool,
    done: AtomicBool,
    batch: u64,
}

impl<T: Send + 'static> PullDriver<T> {
    fn maybe_schedule(self: &Arc<Self>) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        if self.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let me = self.clone();
        self.coordinator.schedule(Box::new(move |c| me.drain(c)));
    }

    fn drain(self: Arc<Self>, coordinator: &Coordinator) {
        if self.demand.is_cancelled() {
            self.done.store(true, Ordering::Release);
            self.scheduled.store(false, Ordering::Release);
            return;
        }
        let max = self.demand.outstanding().min(self.batch);
        if max == 0 {
            self.scheduled.store(false, Ordering::Release);
            return;
        }
        let (emitted, finished) = {
            let mut guard = self.state.lock();
            let PullState { source, observer } = &mut *guard;
            let observer = match observer.as_deref_mut() {
                Some(o) => o,
                None => return,
            };
            source.poll(max, observer)
        };
        self.demand.take(emitted);
        if finished || self.demand.is_cancelled() {
            self.done.store(true, Ordering::Release);
            self.scheduled.store(false, Ordering::Release);
            return;
        }
        if self.demand.outstanding() > 0 {
            let me = self.clone();
            coordinator.schedule(Box::new(move |c| me.drain(c)));
        } else {
            self.scheduled.store(false, Ordering::Release);
        }
    }
}

impl<T: Send + 'static> PullDriver<T> {
    fn grant(&self, n: u64) {
        if self.done.load(Ordering::Acquire) || n == 0 {
            return;
        }
        self.demand.add(n);
    }

    fn cancel(&self) {
        self.demand.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.demand.is_cancelled()
    }
}

impl<T: Send + 'static> DisposableSource for PullDriver<T> {
    fn dispose(&self) {
        self.demand.cancel();
    }

    fn is_disposed(&self) -> bool {
        self.done.load(Ordering::Acquire) || self.demand.is_cancelled()
    }
}

/// `Subscription` wrapper that nudges the driver to (re)schedule
/// itself after granting demand — the `Arc<PullDriver<T>>`-requiring
/// half of `request` that `SubscriptionImpl` itself can't express with
/// a `&self` receiver.
struct PullSubscriptionImpl<T> {
    driver: Arc<PullDriver<T>>,
}

impl<T: Send + 'static> SubscriptionImpl for PullSubscriptionImpl<T> {
    fn request(&self, n: u64) {
        self.driver.grant(n);
        self.driver.maybe_schedule();
    }

    fn cancel(&self) {
        self.driver.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.driver.is_cancelled()
    }
}

/// Subscribe `observer` to a `PullSource`, wiring up a demand-driven
/// driver that produces at most `batch` items per coordinator action.
/// Returns a `Disposable` that cancels the subscription.
pub fn subscribe_pull<T: Send + 'static>(
    coordinator: &Coordinator,
    mut observer: BoxObserver<T>,
    source: Box<dyn PullSource<T>>,
    batch: u64,
) -> Disposable {
    let driver = Arc::new(PullDriver {
        coordinator: coordinator.clone(),
        state: Mutex::new(PullState {
            source,
            observer: None,
        }),
        demand: DemandCounter::new(),
        scheduled: AtomicBool::new(false),
        done: AtomicBool::new(false),
        batch: batch.max(1),
    });

    let subscription = Subscription::new(Arc::new(PullSubscriptionImpl {
        driver: driver.clone(),
    }));
    observer.on_subscribe(subscription);
    driver.state.lock().observer = Some(observer);

    let disposable = Disposable::from_source(driver.clone());
    coordinator.watch(disposable.clone());
    disposable
}
