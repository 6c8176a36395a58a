//! Multicast: `publish`, `share`, `auto_connect`, `ConnectableObservable`
//! (§4.8). An ordinary (cold) `Observable` produces a fresh run of
//! items per subscriber; a connectable observable instead subscribes to
//! its upstream exactly once, on `connect()`, and fans that single run
//! out to every observer attached so far. Observers that attach after
//! `connect()` has already delivered a terminal signal never see what
//! they missed — pre-connect values are dropped for late subscribers
//! (§4.8).
//!
//! Because [`Observable::subscribe`] consumes `self` by value, a hot
//! source that wants more than one subscriber hands out fresh
//! [`BoxObservable`] wrappers from an `Arc`-shared hub rather than
//! being subscribed to directly more than once — `ConnectableObservable::subscriber`
//! and `AutoConnect::subscriber` are how callers mint those wrappers.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::Disposable;
use crate::flow::error::FlowError;
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::{Subscription, SubscriptionImpl};

/// A live subscription for a hot multicast observer: demand is not
/// gated (the hub pushes as items arrive from upstream), so `request`
/// is a no-op and the subscription never reports cancelled on its own.
struct HubSubscription;

impl SubscriptionImpl for HubSubscription {
    fn request(&self, _n: u64) {}
    fn cancel(&self) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[derive(Clone)]
enum Terminal {
    Complete,
    Error(FlowError),
}

struct HubState<T> {
    observers: Mutex<Vec<BoxObserver<T>>>,
    connected: AtomicBool,
    terminal: Mutex<Option<Terminal>>,
}

impl<T: Clone + Send> HubState<T> {
    fn broadcast_next(&self, items: &[T]) {
        let mut observers = self.observers.lock();
        for observer in observers.iter_mut() {
            observer.on_next(items);
        }
    }

    fn broadcast_complete(&self) {
        *self.terminal.lock() = Some(Terminal::Complete);
        let mut observers = self.observers.lock();
        for observer in observers.iter_mut() {
            observer.on_complete();
        }
    }

    fn broadcast_error(&self, error: FlowError) {
        *self.terminal.lock() = Some(Terminal::Error(error.clone()));
        let mut observers = self.observers.lock();
        for observer in observers.iter_mut() {
            observer.on_error(error.clone());
        }
    }
}

struct HubObserver<T> {
    state: Arc<HubState<T>>,
}

impl<T: Clone + Send> Observer<T> for HubObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(u64::MAX);
    }

    fn on_next(&mut self, items: &[T]) {
        self.state.broadcast_next(items);
    }

    fn on_complete(&mut self) {
        self.state.broadcast_complete();
    }

    fn on_error(&mut self, error: FlowError) {
        self.state.broadcast_error(error);
    }
}

/// A cold `Observable` turned hot: `connect()` subscribes the upstream
/// exactly once; every observer attached before or after that point
/// shares the same single run (§4.8).
pub struct ConnectableObservable<T> {
    upstream: Mutex<Option<BoxObservable<T>>>,
    state: Arc<HubState<T>>,
}

impl<T: Clone + Send + 'static> ConnectableObservable<T> {
    fn new(upstream: BoxObservable<T>) -> Self {
        Self {
            upstream: Mutex::new(Some(upstream)),
            state: Arc::new(HubState {
                observers: Mutex::new(Vec::new()),
                connected: AtomicBool::new(false),
                terminal: Mutex::new(None),
            }),
        }
    }

    /// Subscribe the upstream observable, starting the single shared
    /// run. A second call is a no-op.
    pub fn connect(&self, coordinator: &Coordinator) -> Disposable {
        if self.state.connected.swap(true, Ordering::AcqRel) {
            return Disposable::noop();
        }
        let Some(upstream) = self.upstream.lock().take() else {
            return Disposable::noop();
        };
        let observer = Box::new(HubObserver { state: self.state.clone() });
        upstream.subscribe(coordinator, observer)
    }

    /// Attach a new observer to the shared run directly, without
    /// waiting for or forcing a `connect()`.
    pub fn attach(&self, mut observer: BoxObserver<T>) {
        let terminal = self.state.terminal.lock().clone();
        match terminal {
            Some(Terminal::Complete) => {
                observer.on_subscribe(Subscription::already_cancelled());
                observer.on_complete();
            }
            Some(Terminal::Error(error)) => {
                observer.on_subscribe(Subscription::already_cancelled());
                observer.on_error(error);
            }
            None => {
                observer.on_subscribe(Subscription::new(Arc::new(HubSubscription)));
                self.state.observers.lock().push(observer);
            }
        }
    }

    /// Mint a fresh one-shot `BoxObservable` that attaches to this hub
    /// on subscribe, without connecting it (§4.8). Call `connect()`
    /// separately to start the shared run.
    pub fn subscriber(self: &Arc<Self>) -> BoxObservable<T> {
        Box::new(HubSubscriber { hub: self.clone() })
    }
}

struct HubSubscriber<T> {
    hub: Arc<ConnectableObservable<T>>,
}

impl<T: Clone + Send + 'static> Observable<T> for HubSubscriber<T> {
    fn subscribe(self: Box<Self>, _coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable {
        self.hub.attach(observer);
        Disposable::noop()
    }
}

/// Wrap `upstream` in a hub that fans a single subscription out to
/// every attached observer (§4.8). Nothing runs until `connect()` is
/// called, directly or via [`auto_connect`].
pub fn publish<T: Clone + Send + 'static>(upstream: BoxObservable<T>) -> Arc<ConnectableObservable<T>> {
    Arc::new(ConnectableObservable::new(upstream))
}

/// Connects `hub`'s upstream automatically once `n` subscribers have
/// attached via [`AutoConnect::subscriber`] (§4.8). `n == 0` connects
/// on the first subscriber.
pub struct AutoConnect<T> {
    hub: Arc<ConnectableObservable<T>>,
    threshold: usize,
    joined: AtomicUsize,
}

impl<T: Clone + Send + 'static> AutoConnect<T> {
    pub fn subscriber(self: &Arc<Self>) -> BoxObservable<T> {
        Box::new(AutoConnectSubscriber { gate: self.clone() })
    }
}

struct AutoConnectSubscriber<T> {
    gate: Arc<AutoConnect<T>>,
}

impl<T: Clone + Send + 'static> Observable<T> for AutoConnectSubscriber<T> {
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable {
        self.gate.hub.attach(observer);
        let joined = self.gate.joined.fetch_add(1, Ordering::AcqRel) + 1;
        if joined == self.gate.threshold {
            self.gate.hub.connect(coordinator)
        } else {
            Disposable::noop()
        }
    }
}

/// Build an [`AutoConnect`] gate over `hub`, connecting once `n`
/// subscribers have attached (§4.8).
pub fn auto_connect<T: Clone + Send + 'static>(hub: Arc<ConnectableObservable<T>>, n: usize) -> Arc<AutoConnect<T>> {
    Arc::new(AutoConnect {
        hub,
        threshold: n.max(1),
        joined: AtomicUsize::new(0),
    })
}

/// `publish()` composed with `auto_connect(n)` (§4.8): one call that
/// shares a single upstream run across `n` or more subscribers without
/// exposing the intermediate hub.
pub fn share<T: Clone + Send + 'static>(upstream: BoxObservable<T>, n: usize) -> Arc<AutoConnect<T>> {
    auto_connect(publish(upstream), n)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::flow::operators::sources::range;
    use std::sync::atomic::{AtomicBool as StdAtomicBool, Ordering as StdOrdering};
    use std::sync::Mutex as StdMutex;

    struct CollectingObserver {
        items: Arc<StdMutex<Vec<i64>>>,
        completed: Arc<StdAtomicBool>,
    }

    impl Observer<i64> for CollectingObserver {
        fn on_subscribe(&mut self, subscription: Subscription) {
            subscription.request(u64::MAX);
        }

        fn on_next(&mut self, items: &[i64]) {
            self.items.lock().unwrap().extend_from_slice(items);
        }

        fn on_complete(&mut self) {
            self.completed.store(true, StdOrdering::SeqCst);
        }

        fn on_error(&mut self, _error: FlowError) {}
    }

    fn collector() -> (Box<CollectingObserver>, Arc<StdMutex<Vec<i64>>>, Arc<StdAtomicBool>) {
        let items = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(StdAtomicBool::new(false));
        (
            Box::new(CollectingObserver {
                items: items.clone(),
                completed: completed.clone(),
            }),
            items,
            completed,
        )
    }

    #[test]
    fn late_subscriber_after_connect_misses_prior_items_but_still_completes() {
        let coordinator = Coordinator::with_system_clock();
        let hub = publish(range(0, 3));

        let (early, early_items, early_completed) = collector();
        let _d = hub.subscriber().subscribe(&coordinator, early);
        let _connect = hub.connect(&coordinator);
        coordinator.run();
        assert_eq!(*early_items.lock().unwrap(), vec![0, 1, 2]);
        assert!(early_completed.load(StdOrdering::SeqCst));

        let (late, late_items, late_completed) = collector();
        hub.attach(late);
        assert!(late_items.lock().unwrap().is_empty());
        assert!(late_completed.load(StdOrdering::SeqCst));
    }

    #[test]
    fn auto_connect_starts_after_nth_subscriber() {
        let coordinator = Coordinator::with_system_clock();
        let gate = share(range(0, 3), 2);

        let (first, first_items, first_completed) = collector();
        let _d1 = gate.subscriber().subscribe(&coordinator, first);
        coordinator.run();
        assert!(first_items.lock().unwrap().is_empty());
        assert!(!first_completed.load(StdOrdering::SeqCst));

        let (second, second_items, second_completed) = collector();
        let _d2 = gate.subscriber().subscribe(&coordinator, second);
        coordinator.run();
        assert_eq!(*first_items.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(*second_items.lock().unwrap(), vec![0, 1, 2]);
        assert!(first_completed.load(StdOrdering::SeqCst));
        assert!(second_completed.load(StdOrdering::SeqCst));
    }
}
