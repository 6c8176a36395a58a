//! Multi-source combinators: `merge`, `concat`, `zip_with`, and the
//! shared flattening engine behind `flat_map`/`concat_map` (§4.8).
//!
//! `merge` is fail-fast by default (the first branch error tears down
//! every other branch) unless [`MergeOptions::delay_error`] is set, in
//! which case every branch runs to completion and the accumulated
//! errors are reported only once all branches finish.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::{make_composite, Disposable};
use crate::flow::error::FlowError;
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::Subscription;

/// Tuning knobs for [`merge_with_options`] (§4.8).
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// If `true`, a branch error is held until every branch has
    /// finished, then reported; errors from multiple branches collapse
    /// to the first one recorded. Default: `false` (fail-fast).
    pub delay_error: bool,

    /// If `true`, the merged observable completes as soon as any one
    /// branch completes, cancelling the rest. Default: `false` (wait
    /// for every branch).
    pub shutdown_on_last_complete: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            delay_error: false,
            shutdown_on_last_complete: false,
        }
    }
}

struct MergeState {
    remaining: AtomicUsize,
    done: AtomicBool,
    first_error: Mutex<Option<FlowError>>,
}

/// Per-branch bookkeeping shared between every [`MergeBranchObserver`]
/// and the downstream [`MergeSubscriptionImpl`], indexed by the
/// branch's position in the original `sources` vector so fairness
/// doesn't depend on subscribe-call ordering.
///
/// `owed` holds demand split out for a branch that hasn't subscribed
/// yet (it is flushed to the branch's `Subscription` the moment one
/// arrives); `alive` excludes completed/errored branches from future
/// splits (§4.8 "merge splits demand across live inputs fairly").
struct MergeShared {
    subscriptions: Mutex<Vec<Option<Subscription>>>,
    alive: Mutex<Vec<bool>>,
    owed: Mutex<Vec<u64>>,
}

impl MergeShared {
    fn new(count: usize) -> Self {
        Self {
            subscriptions: Mutex::new((0..count).map(|_| None).collect()),
            alive: Mutex::new(vec![true; count]),
            owed: Mutex::new(vec![0; count]),
        }
    }

    fn mark_dead(&self, index: usize) {
        self.alive.lock()[index] = false;
    }

    fn cancel_all(&self) {
        for subscription in self.subscriptions.lock().iter().flatten() {
            subscription.cancel();
        }
    }
}

struct MergeBranchObserver<T> {
    index: usize,
    downstream: Arc<Mutex<BoxObserver<T>>>,
    state: Arc<MergeState>,
    shared: Arc<MergeShared>,
    options: MergeOptions,
}

impl<T: Send> Observer<T> for MergeBranchObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        let pending = {
            let mut owed = self.shared.owed.lock();
            std::mem::replace(&mut owed[self.index], 0)
        };
        if pending > 0 {
            subscription.request(pending);
        }
        self.shared.subscriptions.lock()[self.index] = Some(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        self.downstream.lock().on_next(items);
    }

    fn on_complete(&mut self) {
        self.shared.mark_dead(self.index);
        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if self.options.shutdown_on_last_complete || remaining == 0 {
            if !self.state.done.swap(true, Ordering::AcqRel) {
                self.finish();
            }
        }
    }

    fn on_error(&mut self, error: FlowError) {
        self.shared.mark_dead(self.index);
        if self.options.delay_error {
            {
                let mut first = self.state.first_error.lock();
                if first.is_none() {
                    *first = Some(error);
                }
            }
            let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
            if remaining == 0 && !self.state.done.swap(true, Ordering::AcqRel) {
                self.finish();
            }
        } else if !self.state.done.swap(true, Ordering::AcqRel) {
            self.shared.cancel_all();
            self.downstream.lock().on_error(error);
        }
    }
}

impl<T: Send> MergeBranchObserver<T> {
    fn finish(&self) {
        self.shared.cancel_all();
        let mut downstream = self.downstream.lock();
        match self.state.first_error.lock().take() {
            Some(error) => downstream.on_error(error),
            None => downstream.on_complete(),
        }
    }
}

struct MergeSubscriptionImpl {
    shared: Arc<MergeShared>,
    cancelled: AtomicBool,
}

impl crate::flow::subscription::SubscriptionImpl for MergeSubscriptionImpl {
    /// Split `n` evenly across every still-`alive` branch (remainder
    /// handed to the first branches in index order), matching §4.8's
    /// "merge splits demand across live inputs fairly" rather than
    /// broadcasting the full downstream demand to each one. A branch
    /// that hasn't subscribed yet banks its share in `owed` until it
    /// does.
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let alive = self.shared.alive.lock();
        let live_indices: Vec<usize> = (0..alive.len()).filter(|&i| alive[i]).collect();
        if live_indices.is_empty() {
            return;
        }
        let live = live_indices.len() as u64;
        let base = n / live;
        let extra = n % live;

        let mut subscriptions = self.shared.subscriptions.lock();
        let mut owed = self.shared.owed.lock();
        for (rank, index) in live_indices.into_iter().enumerate() {
            let share = base + u64::from((rank as u64) < extra);
            if share == 0 {
                continue;
            }
            match &subscriptions[index] {
                Some(subscription) => subscription.request(share),
                None => owed[index] += share,
            }
        }
        drop(subscriptions);
        drop(owed);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.shared.cancel_all();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct MergeObservable<T> {
    branches: Vec<BoxObservable<T>>,
    options: MergeOptions,
}

impl<T: Send + 'static> Observable<T> for MergeObservable<T> {
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable {
        let downstream = Arc::new(Mutex::new(observer));
        let state = Arc::new(MergeState {
            remaining: AtomicUsize::new(self.branches.len()),
            done: AtomicBool::new(false),
            first_error: Mutex::new(None),
        });
        if self.branches.is_empty() {
            downstream.lock().on_subscribe(Subscription::already_cancelled());
            downstream.lock().on_complete();
            return Disposable::noop();
        }

        let shared = Arc::new(MergeShared::new(self.branches.len()));

        let subscription = Subscription::new(Arc::new(MergeSubscriptionImpl {
            shared: shared.clone(),
            cancelled: AtomicBool::new(false),
        }));
        downstream.lock().on_subscribe(subscription);

        let mut disposables = Vec::with_capacity(self.branches.len());
        for (index, branch) in self.branches.into_iter().enumerate() {
            let branch_observer = Box::new(MergeBranchObserver {
                index,
                downstream: downstream.clone(),
                state: state.clone(),
                shared: shared.clone(),
                options: self.options,
            });
            disposables.push(branch.subscribe(coordinator, branch_observer));
        }
        make_composite(disposables)
    }
}

/// Interleave items from every observable in `sources` as they arrive
/// (§4.8). Fail-fast: the first branch error cancels the rest and is
/// reported immediately.
pub fn merge<T: Send + 'static>(sources: Vec<BoxObservable<T>>) -> BoxObservable<T> {
    merge_with_options(sources, MergeOptions::default())
}

/// [`merge`] with explicit `delay_error`/`shutdown_on_last_complete`
/// behavior (§4.8).
pub fn merge_with_options<T: Send + 'static>(sources: Vec<BoxObservable<T>>, options: MergeOptions) -> BoxObservable<T> {
    Box::new(MergeObservable {
        branches: sources,
        options,
    })
}

/// Subscribe to each observable in `sources` strictly one after
/// another, in order, forwarding every item; completes once the last
/// one completes, errors as soon as any one errors (§4.8).
pub fn concat<T: Send + 'static>(sources: Vec<BoxObservable<T>>) -> BoxObservable<T> {
    Box::new(ConcatObservable {
        remaining: Mutex::new(VecDeque::from(sources)),
    })
}

struct ConcatObservable<T> {
    remaining: Mutex<VecDeque<BoxObservable<T>>>,
}

impl<T: Send + 'static> Observable<T> for ConcatObservable<T> {
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable {
        let remaining = Arc::new(self.remaining);
        let coordinator = coordinator.clone();
        let downstream = Arc::new(Mutex::new(observer));
        let cancelled = Arc::new(AtomicBool::new(false));

        let subscription = Subscription::new(Arc::new(ConcatCancel {
            cancelled: cancelled.clone(),
        }));
        downstream.lock().on_subscribe(subscription);

        advance_concat(remaining, coordinator, downstream, cancelled.clone());
        Disposable::from_source(Arc::new(ConcatCancel { cancelled }))
    }
}

struct ConcatCancel {
    cancelled: Arc<AtomicBool>,
}

impl crate::flow::disposable::DisposableSource for ConcatCancel {
    fn dispose(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl crate::flow::subscription::SubscriptionImpl for ConcatCancel {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

fn advance_concat<T: Send + 'static>(
    remaining: Arc<Mutex<VecDeque<BoxObservable<T>>>>,
    coordinator: Coordinator,
    downstream: Arc<Mutex<BoxObserver<T>>>,
    cancelled: Arc<AtomicBool>,
) {
    if cancelled.load(Ordering::Acquire) {
        return;
    }
    let next = remaining.lock().pop_front();
    match next {
        None => downstream.lock().on_complete(),
        Some(observable) => {
            let remaining2 = remaining.clone();
            let coordinator2 = coordinator.clone();
            let downstream2 = downstream.clone();
            let cancelled2 = cancelled.clone();
            let observer = Box::new(ConcatBranchObserver {
                downstream: downstream.clone(),
                on_branch_complete: Some(Box::new(move || {
                    advance_concat(remaining2, coordinator2, downstream2, cancelled2);
                })),
            });
            let _ = observable.subscribe(&coordinator, observer);
        }
    }
}

struct ConcatBranchObserver<T> {
    downstream: Arc<Mutex<BoxObserver<T>>>,
    on_branch_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl<T: Send> Observer<T> for ConcatBranchObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(u64::MAX);
    }

    fn on_next(&mut self, items: &[T]) {
        self.downstream.lock().on_next(items);
    }

    fn on_complete(&mut self) {
        if let Some(advance) = self.on_branch_complete.take() {
            advance();
        }
    }

    fn on_error(&mut self, error: FlowError) {
        self.downstream.lock().on_error(error);
    }
}

/// Pair up items from `left` and `right` positionally, applying `f` to
/// each pair; completes (or errors) as soon as either side does
/// (§4.8).
pub fn zip_with<A, B, U, F>(left: BoxObservable<A>, right: BoxObservable<B>, f: F) -> BoxObservable<U>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    U: Send + 'static,
    F: Fn(A, B) -> U + Send + Sync + 'static,
{
    Box::new(ZipObservable {
        left,
        right,
        f: Arc::new(f),
        _marker: std::marker::PhantomData,
    })
}

struct ZipObservable<A, B, U, F> {
    left: BoxObservable<A>,
    right: BoxObservable<B>,
    f: Arc<F>,
    _marker: std::marker::PhantomData<fn() -> U>,
}

impl<A, B, U, F> Observable<U> for ZipObservable<A, B, U, F>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    U: Send + 'static,
    F: Fn(A, B) -> U + Send + Sync + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<U>) -> Disposable {
        let state = Arc::new(ZipState {
            downstream: Mutex::new(observer),
            left_buf: Mutex::new(VecDeque::new()),
            right_buf: Mutex::new(VecDeque::new()),
            left_done: AtomicBool::new(false),
            right_done: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            f: self.f,
        });

        let shared = Arc::new(ZipShared {
            left: Mutex::new(None),
            right: Mutex::new(None),
            left_owed: AtomicU64::new(0),
            right_owed: AtomicU64::new(0),
        });
        let subscription = Subscription::new(Arc::new(ZipSubscriptionImpl {
            shared: shared.clone(),
        }));
        state.downstream.lock().on_subscribe(subscription);

        let left_observer = Box::new(ZipLeftObserver {
            state: state.clone(),
            shared: shared.clone(),
        });
        let right_observer = Box::new(ZipRightObserver {
            state: state.clone(),
            shared: shared.clone(),
        });

        let left_disposable = self.left.subscribe(coordinator, left_observer);
        let right_disposable = self.right.subscribe(coordinator, right_observer);
        make_composite(vec![left_disposable, right_disposable])
    }
}

/// Each side's `Subscription`, filled in once that side subscribes,
/// plus demand banked for a side that hasn't subscribed yet.
struct ZipShared {
    left: Mutex<Option<Subscription>>,
    right: Mutex<Option<Subscription>>,
    left_owed: AtomicU64,
    right_owed: AtomicU64,
}

struct ZipSubscriptionImpl {
    shared: Arc<ZipShared>,
}

impl crate::flow::subscription::SubscriptionImpl for ZipSubscriptionImpl {
    /// Forward the full downstream demand to *both* sides (§4.8:
    /// "demand forwarded to all inputs equal to downstream demand") —
    /// unlike `merge`, zip does not split `n` across inputs. A side
    /// that hasn't subscribed yet banks its share in `*_owed` until it
    /// does.
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        match self.shared.left.lock().as_ref() {
            Some(subscription) => subscription.request(n),
            None => {
                self.shared.left_owed.fetch_add(n, Ordering::AcqRel);
            }
        }
        match self.shared.right.lock().as_ref() {
            Some(subscription) => subscription.request(n),
            None => {
                self.shared.right_owed.fetch_add(n, Ordering::AcqRel);
            }
        }
    }

    fn cancel(&self) {
        if let Some(subscription) = self.shared.left.lock().as_ref() {
            subscription.cancel();
        }
        if let Some(subscription) = self.shared.right.lock().as_ref() {
            subscription.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

struct ZipState<A, B, U, F> {
    downstream: Mutex<BoxObserver<U>>,
    left_buf: Mutex<VecDeque<A>>,
    right_buf: Mutex<VecDeque<B>>,
    left_done: AtomicBool,
    right_done: AtomicBool,
    finished: AtomicBool,
    f: Arc<F>,
}

impl<A, B, U, F> ZipState<A, B, U, F>
where
    A: Send,
    B: Send,
    U: Send,
    F: Fn(A, B) -> U,
{
    fn drain_pairs(&self) {
        loop {
            if self.finished.load(Ordering::Acquire) {
                return;
            }
            let mut left_buf = self.left_buf.lock();
            let mut right_buf = self.right_buf.lock();
            if left_buf.is_empty() || right_buf.is_empty() {
                let exhausted = (self.left_done.load(Ordering::Acquire) && left_buf.is_empty())
                    || (self.right_done.load(Ordering::Acquire) && right_buf.is_empty());
                drop(left_buf);
                drop(right_buf);
                if exhausted && !self.finished.swap(true, Ordering::AcqRel) {
                    self.downstream.lock().on_complete();
                }
                return;
            }
            let Some(a) = left_buf.pop_front() else {
                return;
            };
            let Some(b) = right_buf.pop_front() else {
                return;
            };
            drop(left_buf);
            drop(right_buf);
            let item = (self.f)(a, b);
            self.downstream.lock().on_next(std::slice::from_ref(&item));
        }
    }
}

struct ZipLeftObserver<A, B, U, F> {
    state: Arc<ZipState<A, B, U, F>>,
    shared: Arc<ZipShared>,
}

impl<A, B, U, F> Observer<A> for ZipLeftObserver<A, B, U, F>
where
    A: Clone + Send,
    B: Send,
    U: Send,
    F: Fn(A, B) -> U + Send + Sync,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        let pending = self.shared.left_owed.swap(0, Ordering::AcqRel);
        if pending > 0 {
            subscription.request(pending);
        }
        *self.shared.left.lock() = Some(subscription);
    }

    fn on_next(&mut self, items: &[A]) {
        self.state.left_buf.lock().extend(items.iter().cloned());
        self.state.drain_pairs();
    }

    fn on_complete(&mut self) {
        self.state.left_done.store(true, Ordering::Release);
        self.state.drain_pairs();
    }

    fn on_error(&mut self, error: FlowError) {
        if !self.state.finished.swap(true, Ordering::AcqRel) {
            if let Some(subscription) = self.shared.left.lock().as_ref() {
                subscription.cancel();
            }
            if let Some(subscription) = self.shared.right.lock().as_ref() {
                subscription.cancel();
            }
            self.state.downstream.lock().on_error(error);
        }
    }
}

struct ZipRightObserver<A, B, U, F> {
    state: Arc<ZipState<A, B, U, F>>,
    shared: Arc<ZipShared>,
}

impl<A, B, U, F> Observer<B> for ZipRightObserver<A, B, U, F>
where
    A: Send,
    B: Clone + Send,
    U: Send,
    F: Fn(A, B) -> U + Send + Sync,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        let pending = self.shared.right_owed.swap(0, Ordering::AcqRel);
        if pending > 0 {
            subscription.request(pending);
        }
        *self.shared.right.lock() = Some(subscription);
    }

    fn on_next(&mut self, items: &[B]) {
        self.state.right_buf.lock().extend(items.iter().cloned());
        self.state.drain_pairs();
    }

    fn on_complete(&mut self) {
        self.state.right_done.store(true, Ordering::Release);
        self.state.drain_pairs();
    }

    fn on_error(&mut self, error: FlowError) {
        if !self.state.finished.swap(true, Ordering::AcqRel) {
            if let Some(subscription) = self.shared.left.lock().as_ref() {
                subscription.cancel();
            }
            if let Some(subscription) = self.shared.right.lock().as_ref() {
                subscription.cancel();
            }
            self.state.downstream.lock().on_error(error);
        }
    }
}

/// The engine behind `flat_map`/`concat_map`: maps each upstream item
/// to an inner observable via `f`, then either subscribes to every
/// inner observable concurrently as items arrive (`sequential =
/// false`, `flat_map`) or strictly one at a time in arrival order
/// (`sequential = true`, `concat_map`) (§4.8). Demand is not threaded
/// through precisely — every upstream and inner subscription is
/// granted `u64::MAX` up front — trading exact backpressure accounting
/// for a much simpler fan-out/fan-in implementation.
pub struct FlattenObservable<T, U, F> {
    upstream: BoxObservable<T>,
    f: Arc<F>,
    sequential: bool,
    _marker: std::marker::PhantomData<fn() -> U>,
}

impl<T, U, F> FlattenObservable<T, U, F>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> BoxObservable<U> + Send + Sync + 'static,
{
    pub fn new(upstream: BoxObservable<T>, f: F, sequential: bool) -> Self {
        Self {
            upstream,
            f: Arc::new(f),
            sequential,
            _marker: std::marker::PhantomData,
        }
    }
}

struct FlattenState<U> {
    downstream: Mutex<BoxObserver<U>>,
    coordinator: Coordinator,
    active: AtomicUsize,
    upstream_done: AtomicBool,
    finished: AtomicBool,
    pending: Mutex<VecDeque<BoxObservable<U>>>,
    sequential: bool,
    cancelled: Arc<AtomicBool>,
}

impl<U: Send + 'static> FlattenState<U> {
    fn check_finished(&self) {
        if self.finished.load(Ordering::Acquire) {
            return;
        }
        let idle = self.active.load(Ordering::Acquire) == 0 && self.pending.lock().is_empty();
        if self.upstream_done.load(Ordering::Acquire) && idle && !self.finished.swap(true, Ordering::AcqRel) {
            self.downstream.lock().on_complete();
        }
    }

    fn fail(&self, error: FlowError) {
        if !self.finished.swap(true, Ordering::AcqRel) {
            self.cancelled.store(true, Ordering::Release);
            self.downstream.lock().on_error(error);
        }
    }

    fn spawn_next_if_sequential(self: &Arc<Self>) {
        if !self.sequential || self.cancelled.load(Ordering::Acquire) {
            return;
        }
        if self.active.load(Ordering::Acquire) > 0 {
            return;
        }
        let next = self.pending.lock().pop_front();
        if let Some(inner) = next {
            spawn_inner(self.clone(), inner);
        }
    }
}

fn spawn_inner<U: Send + 'static>(state: Arc<FlattenState<U>>, inner: BoxObservable<U>) {
    state.active.fetch_add(1, Ordering::AcqRel);
    let observer = Box::new(FlattenInnerObserver { state: state.clone() });
    let coordinator = state.coordinator.clone();
    let _ = inner.subscribe(&coordinator, observer);
}

struct FlattenInnerObserver<U> {
    state: Arc<FlattenState<U>>,
}

impl<U: Send> Observer<U> for FlattenInnerObserver<U> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(u64::MAX);
    }

    fn on_next(&mut self, items: &[U]) {
        if !self.state.cancelled.load(Ordering::Acquire) {
            self.state.downstream.lock().on_next(items);
        }
    }

    fn on_complete(&mut self) {
        self.state.active.fetch_sub(1, Ordering::AcqRel);
        self.state.spawn_next_if_sequential();
        self.state.check_finished();
    }

    fn on_error(&mut self, error: FlowError) {
        self.state.fail(error);
    }
}

struct FlattenUpstreamObserver<T, U, F> {
    state: Arc<FlattenState<U>>,
    f: Arc<F>,
    subscription: Option<Subscription>,
    _marker: std::marker::PhantomData<T>,
}

impl<T, U, F> Observer<T> for FlattenUpstreamObserver<T, U, F>
where
    T: Clone + Send,
    U: Send + 'static,
    F: Fn(T) -> BoxObservable<U> + Send + Sync + 'static,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(u64::MAX);
        self.subscription = Some(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        for item in items {
            let inner = (self.f)(item.clone());
            if self.state.sequential {
                self.state.pending.lock().push_back(inner);
                self.state.spawn_next_if_sequential();
            } else {
                spawn_inner(self.state.clone(), inner);
            }
        }
    }

    fn on_complete(&mut self) {
        self.state.upstream_done.store(true, Ordering::Release);
        self.state.check_finished();
    }

    fn on_error(&mut self, error: FlowError) {
        self.state.fail(error);
    }
}

struct FlattenCancel {
    cancelled: Arc<AtomicBool>,
}

impl crate::flow::disposable::DisposableSource for FlattenCancel {
    fn dispose(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<T, U, F> Observable<U> for FlattenObservable<T, U, F>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> BoxObservable<U> + Send + Sync + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<U>) -> Disposable {
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = Arc::new(FlattenState {
            downstream: Mutex::new(observer),
            coordinator: coordinator.clone(),
            active: AtomicUsize::new(0),
            upstream_done: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            pending: Mutex::new(VecDeque::new()),
            sequential: self.sequential,
            cancelled: cancelled.clone(),
        });
        let upstream_observer = Box::new(FlattenUpstreamObserver {
            state: state.clone(),
            f: self.f,
            subscription: None,
            _marker: std::marker::PhantomData,
        });
        let upstream_disposable = self.upstream.subscribe(coordinator, upstream_observer);
        make_composite(vec![
            upstream_disposable,
            Disposable::from_source(Arc::new(FlattenCancel { cancelled })),
        ])
    }
}
