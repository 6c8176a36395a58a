//! Batching operators: `buffer(n)`, `buffer(n, period)`,
//! `prefix_and_tail`, `head_and_tail` (§4.8, §9).
//!
//! `buffer` groups upstream items into `Vec<T>` batches, each delivered
//! as a single downstream item. The timed variant additionally flushes
//! whatever is pending every `period`, regardless of whether `n` has
//! been reached; `emit_empty` selects the no-skip policy (an empty
//! batch is still emitted on a timer tick with nothing pending) versus
//! the default skip policy.
//!
//! `prefix_and_tail`/`head_and_tail` split a source into its first `n`
//! items (delivered once, eagerly) and a nested `Observable` carrying
//! everything after. The nested tail shares a single live upstream
//! subscription with the prefix collector: items that arrive before
//! anyone subscribes to the tail are buffered and replayed at
//! subscribe time.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::{Disposable, DisposableSource};
use crate::flow::error::FlowError;
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::{Subscription, SubscriptionImpl};

struct BufferState<T> {
    downstream: Mutex<BoxObserver<Vec<T>>>,
    pending: Mutex<Vec<T>>,
    n: usize,
    done: AtomicBool,
}

impl<T: Send> BufferState<T> {
    /// Used by the periodic timer: a no-op once `done` is set, so a
    /// stray tick after completion/error never reaches downstream.
    fn flush(&self, force_even_if_empty: bool) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        self.flush_now(force_even_if_empty);
    }

    /// Used by `on_complete` itself, which sets `done` first (as an
    /// idempotency guard) and still needs the final partial batch to
    /// go out.
    fn flush_now(&self, force_even_if_empty: bool) {
        let mut pending = self.pending.lock();
        if pending.is_empty() && !force_even_if_empty {
            return;
        }
        let batch = std::mem::take(&mut *pending);
        drop(pending);
        self.downstream.lock().on_next(std::slice::from_ref(&batch));
    }
}

/// Multiplies every downstream `request(n)` by the batch size before
/// forwarding it upstream (§4.8: "buffer(n) requests n upstream per
/// downstream-item-of-1") — a downstream wanting one more batch needs
/// `n` more raw items to ever fill it.
struct BufferDemandMultiplier {
    inner: Subscription,
    n: u64,
}

impl SubscriptionImpl for BufferDemandMultiplier {
    fn request(&self, n: u64) {
        self.inner.request(n.saturating_mul(self.n));
    }

    fn cancel(&self) {
        self.inner.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

struct BufferUpstreamObserver<T> {
    state: Arc<BufferState<T>>,
}

impl<T: Clone + Send> Observer<T> for BufferUpstreamObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        let wrapped = Subscription::new(Arc::new(BufferDemandMultiplier {
            inner: subscription,
            n: self.state.n as u64,
        }));
        self.state.downstream.lock().on_subscribe(wrapped);
    }

    fn on_next(&mut self, items: &[T]) {
        let mut pending = self.state.pending.lock();
        pending.extend(items.iter().cloned());
        while pending.len() >= self.state.n {
            let batch: Vec<T> = pending.drain(..self.state.n).collect();
            drop(pending);
            self.state.downstream.lock().on_next(std::slice::from_ref(&batch));
            pending = self.state.pending.lock();
        }
    }

    fn on_complete(&mut self) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.flush_now(false);
        self.state.downstream.lock().on_complete();
    }

    fn on_error(&mut self, error: FlowError) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.downstream.lock().on_error(error);
    }
}

struct BufferObservable<T> {
    upstream: BoxObservable<T>,
    n: usize,
    period: Option<Duration>,
    emit_empty: bool,
}

impl<T> Observable<Vec<T>> for BufferObservable<T>
where
    T: Clone + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, downstream: BoxObserver<Vec<T>>) -> Disposable {
        let state = Arc::new(BufferState {
            downstream: Mutex::new(downstream),
            pending: Mutex::new(Vec::new()),
            n: self.n.max(1),
            done: AtomicBool::new(false),
        });
        let observer = Box::new(BufferUpstreamObserver { state: state.clone() });
        let disposable = self.upstream.subscribe(coordinator, observer);

        if let Some(period) = self.period {
            schedule_periodic_flush(coordinator.clone(), state, period, self.emit_empty);
        }

        disposable
    }
}

fn schedule_periodic_flush<T: Send + 'static>(
    coordinator: Coordinator,
    state: Arc<BufferState<T>>,
    period: Duration,
    emit_empty: bool,
) {
    if state.done.load(Ordering::Acquire) {
        return;
    }
    coordinator.delay_for(
        period,
        Box::new(move |c| {
            state.flush(emit_empty);
            schedule_periodic_flush(c.clone(), state, period, emit_empty);
        }),
    );
}

/// Group upstream items into fixed-size `Vec<T>` batches; the final,
/// possibly-short batch is still flushed on completion (§4.8), unlike
/// an empty tick of the timed variant's periodic flush.
pub fn buffer<T: Clone + Send + 'static>(upstream: BoxObservable<T>, n: usize) -> BoxObservable<Vec<T>> {
    Box::new(BufferObservable {
        upstream,
        n,
        period: None,
        emit_empty: false,
    })
}

/// Like [`buffer`], but also flushes whatever is pending every `period`
/// even if fewer than `n` items have arrived. `emit_empty` selects
/// whether an empty batch is still emitted when a tick finds nothing
/// pending (§4.8/§9's skip vs. no-skip policy).
pub fn buffer_timed<T: Clone + Send + 'static>(
    upstream: BoxObservable<T>,
    n: usize,
    period: Duration,
    emit_empty: bool,
) -> BoxObservable<Vec<T>> {
    Box::new(BufferObservable {
        upstream,
        n,
        period: Some(period),
        emit_empty,
    })
}

struct CancelFlagSubscription {
    cancelled: Arc<AtomicBool>,
}

impl SubscriptionImpl for CancelFlagSubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct CancelFlagDisposable {
    cancelled: Arc<AtomicBool>,
}

impl DisposableSource for CancelFlagDisposable {
    fn dispose(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

enum TailTerminal {
    Complete,
    Error(FlowError),
}

/// State shared between the `PrefixCollector` driving upstream and
/// whichever `Observer` eventually subscribes to the nested tail
/// observable. Items arriving before the tail is subscribed to are
/// buffered and replayed at subscribe time.
struct TailShared<T> {
    items: Mutex<VecDeque<T>>,
    observer: Mutex<Option<BoxObserver<T>>>,
    terminal: Mutex<Option<TailTerminal>>,
    cancelled: Arc<AtomicBool>,
}

impl<T: Send> TailShared<T> {
    fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            observer: Mutex::new(None),
            terminal: Mutex::new(None),
            cancelled,
        }
    }

    fn push(&self, item: T) {
        let mut observer = self.observer.lock();
        match observer.as_deref_mut() {
            Some(o) => o.on_next(std::slice::from_ref(&item)),
            None => self.items.lock().push_back(item),
        }
    }

    fn complete(&self) {
        let mut observer = self.observer.lock();
        match observer.as_deref_mut() {
            Some(o) => o.on_complete(),
            None => *self.terminal.lock() = Some(TailTerminal::Complete),
        }
    }

    fn error(&self, error: FlowError) {
        let mut observer = self.observer.lock();
        match observer.as_deref_mut() {
            Some(o) => o.on_error(error),
            None => *self.terminal.lock() = Some(TailTerminal::Error(error)),
        }
    }
}

struct TailObservable<T> {
    shared: Arc<TailShared<T>>,
}

impl<T: Send + 'static> Observable<T> for TailObservable<T> {
    fn subscribe(self: Box<Self>, _coordinator: &Coordinator, mut observer: BoxObserver<T>) -> Disposable {
        let subscription = Subscription::new(Arc::new(CancelFlagSubscription {
            cancelled: self.shared.cancelled.clone(),
        }));
        observer.on_subscribe(subscription);

        let buffered: Vec<T> = self.shared.items.lock().drain(..).collect();
        if !buffered.is_empty() {
            observer.on_next(&buffered);
        }
        match self.shared.terminal.lock().take() {
            Some(TailTerminal::Complete) => {
                observer.on_complete();
                return Disposable::noop();
            }
            Some(TailTerminal::Error(error)) => {
                observer.on_error(error);
                return Disposable::noop();
            }
            None => {}
        }
        *self.shared.observer.lock() = Some(observer);
        Disposable::from_source(Arc::new(CancelFlagDisposable {
            cancelled: self.shared.cancelled.clone(),
        }))
    }
}

/// Collects the first `n` upstream items, then hands `shape` the
/// collected prefix plus a tail observable over everything after.
/// `shape` returning `None` means "don't deliver a pair, just
/// complete" — used by `head_and_tail` when upstream never produced a
/// single item.
struct PrefixCollector<T, R, S> {
    prefix: Vec<T>,
    n: usize,
    shared: Arc<TailShared<T>>,
    downstream: Option<BoxObserver<R>>,
    emitted: bool,
    shape: S,
}

impl<T, R, S> Observer<T> for PrefixCollector<T, R, S>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    S: Fn(Vec<T>, BoxObservable<T>) -> Option<R> + Send + 'static,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(u64::MAX);
    }

    fn on_next(&mut self, items: &[T]) {
        for item in items {
            if !self.emitted && self.prefix.len() < self.n {
                self.prefix.push(item.clone());
                if self.prefix.len() == self.n {
                    self.emit_pair();
                }
            } else {
                self.shared.push(item.clone());
            }
        }
    }

    fn on_complete(&mut self) {
        self.emit_pair();
        self.shared.complete();
    }

    fn on_error(&mut self, error: FlowError) {
        if !self.emitted {
            self.emitted = true;
            if let Some(mut downstream) = self.downstream.take() {
                downstream.on_error(error.clone());
            }
        }
        self.shared.error(error);
    }
}

impl<T, R, S> PrefixCollector<T, R, S>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    S: Fn(Vec<T>, BoxObservable<T>) -> Option<R> + Send + 'static,
{
    /// Deliver the `(prefix, tail)` pair and complete — but only if a
    /// full `n`-item prefix was actually collected. Per §4.8: "If
    /// fewer than `k` items arrive before source completes, the outer
    /// observable completes without emission." Called both when the
    /// prefix fills up naturally (always exactly `n` then) and from
    /// `on_complete` (possibly short), so the length check is what
    /// tells those two cases apart.
    fn emit_pair(&mut self) {
        if self.emitted {
            return;
        }
        self.emitted = true;
        if let Some(mut downstream) = self.downstream.take() {
            if self.prefix.len() == self.n {
                let tail: BoxObservable<T> = Box::new(TailObservable {
                    shared: self.shared.clone(),
                });
                let prefix = std::mem::take(&mut self.prefix);
                if let Some(pair) = (self.shape)(prefix, tail) {
                    downstream.on_next(std::slice::from_ref(&pair));
                }
            }
            downstream.on_complete();
        }
    }
}

struct PrefixAndTailObservable<T, R, S> {
    upstream: BoxObservable<T>,
    n: usize,
    shape: S,
    _marker: std::marker::PhantomData<fn() -> R>,
}

impl<T, R, S> Observable<R> for PrefixAndTailObservable<T, R, S>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    S: Fn(Vec<T>, BoxObservable<T>) -> Option<R> + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, downstream: BoxObserver<R>) -> Disposable {
        let cancelled = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(TailShared::new(cancelled));
        let collector = Box::new(PrefixCollector {
            prefix: Vec::with_capacity(self.n),
            n: self.n.max(1),
            shared,
            downstream: Some(downstream),
            emitted: false,
            shape: self.shape,
        });
        self.upstream.subscribe(coordinator, collector)
    }
}

/// Split `upstream` into its first `n` items (delivered once as a
/// `Vec<T>`) and a nested `Observable` over everything after (§4.8,
/// §9). If upstream completes with fewer than `n` items, the pair is
/// still delivered with the short prefix collected so far.
pub fn prefix_and_tail<T: Clone + Send + 'static>(
    upstream: BoxObservable<T>,
    n: usize,
) -> BoxObservable<(Vec<T>, BoxObservable<T>)> {
    Box::new(PrefixAndTailObservable {
        upstream,
        n,
        shape: |prefix: Vec<T>, tail: BoxObservable<T>| Some((prefix, tail)),
        _marker: std::marker::PhantomData,
    })
}

/// `prefix_and_tail` specialized to a single head item (§4.8). If
/// upstream completes with no items at all, the pair is never
/// delivered and the returned observable simply completes empty.
pub fn head_and_tail<T: Clone + Send + 'static>(upstream: BoxObservable<T>) -> BoxObservable<(T, BoxObservable<T>)> {
    Box::new(PrefixAndTailObservable {
        upstream,
        n: 1,
        shape: |mut prefix: Vec<T>, tail: BoxObservable<T>| prefix.pop().map(|head| (head, tail)),
        _marker: std::marker::PhantomData,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::flow::operators::sources::{empty, range};
    use std::sync::atomic::{AtomicBool as StdAtomicBool, Ordering as StdOrdering};
    use std::sync::Mutex as StdMutex;

    struct CollectingObserver<T> {
        items: Arc<StdMutex<Vec<T>>>,
        completed: Arc<StdAtomicBool>,
    }

    impl<T: Clone + Send> Observer<T> for CollectingObserver<T> {
        fn on_subscribe(&mut self, subscription: Subscription) {
            subscription.request(u64::MAX);
        }

        fn on_next(&mut self, items: &[T]) {
            self.items.lock().unwrap().extend_from_slice(items);
        }

        fn on_complete(&mut self) {
            self.completed.store(true, StdOrdering::SeqCst);
        }

        fn on_error(&mut self, _error: FlowError) {}
    }

    fn run_collect<T: Clone + Send + 'static>(observable: BoxObservable<T>) -> (Vec<T>, bool) {
        let coordinator = Coordinator::with_system_clock();
        let items = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(StdAtomicBool::new(false));
        let observer = Box::new(CollectingObserver {
            items: items.clone(),
            completed: completed.clone(),
        });
        let _disposable = observable.subscribe(&coordinator, observer);
        coordinator.run();
        (items.lock().unwrap().clone(), completed.load(StdOrdering::SeqCst))
    }

    #[test]
    fn buffer_groups_into_fixed_size_batches_with_short_final_batch() {
        let (items, completed) = run_collect(buffer(range(0, 7), 3));
        assert_eq!(items, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
        assert!(completed);
    }

    #[test]
    fn buffer_exact_multiple_has_no_short_batch() {
        let (items, completed) = run_collect(buffer(range(0, 6), 3));
        assert_eq!(items, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert!(completed);
    }

    #[test]
    fn buffer_on_empty_source_completes_with_no_batches() {
        let (items, completed) = run_collect(buffer(empty(), 3));
        assert!(items.is_empty());
        assert!(completed);
    }

    #[test]
    fn prefix_and_tail_splits_head_from_rest() {
        let coordinator = Coordinator::with_system_clock();
        let prefix_slot: Arc<StdMutex<Option<Vec<i64>>>> = Arc::new(StdMutex::new(None));

        struct PairObserver {
            prefix_slot: Arc<StdMutex<Option<Vec<i64>>>>,
        }

        impl Observer<(Vec<i64>, BoxObservable<i64>)> for PairObserver {
            fn on_subscribe(&mut self, subscription: Subscription) {
                subscription.request(u64::MAX);
            }

            fn on_next(&mut self, items: &[(Vec<i64>, BoxObservable<i64>)]) {
                let (prefix, _tail) = &items[0];
                *self.prefix_slot.lock().unwrap() = Some(prefix.clone());
            }

            fn on_complete(&mut self) {}
            fn on_error(&mut self, _error: FlowError) {}
        }

        let observer = Box::new(PairObserver {
            prefix_slot: prefix_slot.clone(),
        });
        let _disposable = prefix_and_tail(range(0, 5), 2).subscribe(&coordinator, observer);
        coordinator.run();
        assert_eq!(*prefix_slot.lock().unwrap(), Some(vec![0, 1]));
    }

    #[test]
    fn prefix_and_tail_completes_without_emission_when_upstream_completes_early() {
        let coordinator = Coordinator::with_system_clock();
        let prefix_slot: Arc<StdMutex<Option<Vec<i64>>>> = Arc::new(StdMutex::new(None));
        let completed = Arc::new(StdAtomicBool::new(false));

        struct PairObserver {
            prefix_slot: Arc<StdMutex<Option<Vec<i64>>>>,
            completed: Arc<StdAtomicBool>,
        }
        impl Observer<(Vec<i64>, BoxObservable<i64>)> for PairObserver {
            fn on_subscribe(&mut self, subscription: Subscription) {
                subscription.request(u64::MAX);
            }
            fn on_next(&mut self, items: &[(Vec<i64>, BoxObservable<i64>)]) {
                let (prefix, _tail) = &items[0];
                *self.prefix_slot.lock().unwrap() = Some(prefix.clone());
            }
            fn on_complete(&mut self) {
                self.completed.store(true, StdOrdering::SeqCst);
            }
            fn on_error(&mut self, _error: FlowError) {}
        }

        let observer = Box::new(PairObserver {
            prefix_slot: prefix_slot.clone(),
            completed: completed.clone(),
        });
        // Source produces only 1 item but the prefix wants 5: §4.8 says
        // the outer observable completes without ever emitting a pair.
        let _disposable = prefix_and_tail(range(0, 1), 5).subscribe(&coordinator, observer);
        coordinator.run();
        assert_eq!(*prefix_slot.lock().unwrap(), None);
        assert!(completed.load(StdOrdering::SeqCst));
    }

    #[test]
    fn head_and_tail_exposes_first_item() {
        let coordinator = Coordinator::with_system_clock();
        let head: Arc<StdMutex<Option<i64>>> = Arc::new(StdMutex::new(None));

        struct HeadObserver {
            head: Arc<StdMutex<Option<i64>>>,
        }
        impl Observer<(i64, BoxObservable<i64>)> for HeadObserver {
            fn on_subscribe(&mut self, subscription: Subscription) {
                subscription.request(u64::MAX);
            }
            fn on_next(&mut self, items: &[(i64, BoxObservable<i64>)]) {
                if let Some((head, _)) = items.first() {
                    *self.head.lock().unwrap() = Some(*head);
                }
            }
            fn on_complete(&mut self) {}
            fn on_error(&mut self, _error: FlowError) {}
        }

        let observer = Box::new(HeadObserver { head: head.clone() });
        let _disposable = head_and_tail(range(0, 5)).subscribe(&coordinator, observer);
        coordinator.run();
        assert_eq!(*head.lock().unwrap(), Some(0));
    }

    #[test]
    fn head_and_tail_on_empty_source_never_delivers_head() {
        let coordinator = Coordinator::with_system_clock();
        let delivered = Arc::new(StdAtomicBool::new(false));
        let completed = Arc::new(StdAtomicBool::new(false));

        struct HeadObserver {
            delivered: Arc<StdAtomicBool>,
            completed: Arc<StdAtomicBool>,
        }
        impl Observer<(i64, BoxObservable<i64>)> for HeadObserver {
            fn on_subscribe(&mut self, subscription: Subscription) {
                subscription.request(u64::MAX);
            }
            fn on_next(&mut self, _items: &[(i64, BoxObservable<i64>)]) {
                self.delivered.store(true, StdOrdering::SeqCst);
            }
            fn on_complete(&mut self) {
                self.completed.store(true, StdOrdering::SeqCst);
            }
            fn on_error(&mut self, _error: FlowError) {}
        }

        let observer = Box::new(HeadObserver {
            delivered: delivered.clone(),
            completed: completed.clone(),
        });
        let _disposable = head_and_tail(empty()).subscribe(&coordinator, observer);
        coordinator.run();
        assert!(!delivered.load(StdOrdering::SeqCst));
        assert!(completed.load(StdOrdering::SeqCst));
    }
}
