//! Per-item transforms: `map`, `filter`, `take`, `take_while`, `skip`,
//! `distinct`, `sum`, and the flattening family `flat_map`,
//! `flat_map_optional`, `concat_map` (§4.8).
//!
//! All but the flattening family and `take`/`take_while` are built the
//! same way: wrap the downstream `Observer` so it sees
//! transformed/filtered items, and pass the upstream `Subscription`
//! straight through to the downstream `on_subscribe` — these operators
//! don't change the demand protocol, only what rides on top of it.
//! `take`/`take_while` additionally need to cancel upstream early, so
//! they hold on to the subscription themselves.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::Disposable;
use crate::flow::error::FlowError;
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::Subscription;

pub fn map<T, U, F>(upstream: BoxObservable<T>, mut f: F) -> BoxObservable<U>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    Box::new(FnObservable::new(upstream, move |items: &[T], downstream: &mut dyn Observer<U>| {
        let mapped: Vec<U> = items.iter().cloned().map(&mut f).collect();
        if !mapped.is_empty() {
            downstream.on_next(&mapped);
        }
    }))
}

pub fn filter<T, F>(upstream: BoxObservable<T>, mut predicate: F) -> BoxObservable<T>
where
    T: Clone + Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    Box::new(FnObservable::new(upstream, move |items: &[T], downstream: &mut dyn Observer<T>| {
        let kept: Vec<T> = items.iter().filter(|item| predicate(item)).cloned().collect();
        if !kept.is_empty() {
            downstream.on_next(&kept);
        }
    }))
}

/// Keep at most `n` items, then cancel upstream and complete downstream
/// (§4.8).
pub fn take<T>(upstream: BoxObservable<T>, n: u64) -> BoxObservable<T>
where
    T: Clone + Send + 'static,
{
    Box::new(StatefulObservable {
        upstream,
        make_observer: move |downstream: BoxObserver<T>| -> BoxObserver<T> {
            Box::new(TakeObserver {
                downstream,
                remaining: n,
                subscription: None,
                done: false,
            })
        },
    })
}

struct TakeObserver<T> {
    downstream: BoxObserver<T>,
    remaining: u64,
    subscription: Option<Subscription>,
    done: bool,
}

impl<T: Clone + Send> Observer<T> for TakeObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        if self.remaining == 0 {
            subscription.cancel();
            self.downstream.on_subscribe(Subscription::already_cancelled());
            self.downstream.on_complete();
            self.done = true;
            return;
        }
        self.subscription = Some(subscription.clone());
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        if self.done {
            return;
        }
        let take_count = (items.len() as u64).min(self.remaining) as usize;
        self.remaining -= take_count as u64;
        if take_count > 0 {
            self.downstream.on_next(&items[..take_count]);
        }
        if self.remaining == 0 {
            self.done = true;
            if let Some(subscription) = &self.subscription {
                subscription.cancel();
            }
            self.downstream.on_complete();
        }
    }

    fn on_complete(&mut self) {
        if !self.done {
            self.done = true;
            self.downstream.on_complete();
        }
    }

    fn on_error(&mut self, error: FlowError) {
        if !self.done {
            self.done = true;
            self.downstream.on_error(error);
        }
    }
}

/// Keep items while `predicate` holds, then cancel and complete on the
/// first failing item (§4.8).
pub fn take_while<T, F>(upstream: BoxObservable<T>, predicate: F) -> BoxObservable<T>
where
    T: Clone + Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    let predicate = Arc::new(Mutex::new(predicate));
    Box::new(StatefulObservable {
        upstream,
        make_observer: move |downstream: BoxObserver<T>| -> BoxObserver<T> {
            Box::new(TakeWhileObserver {
                downstream,
                predicate: predicate.clone(),
                subscription: None,
                done: false,
            })
        },
    })
}

struct TakeWhileObserver<T, F> {
    downstream: BoxObserver<T>,
    predicate: Arc<Mutex<F>>,
    subscription: Option<Subscription>,
    done: bool,
}

impl<T, F> Observer<T> for TakeWhileObserver<T, F>
where
    T: Clone + Send,
    F: FnMut(&T) -> bool + Send,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription.clone());
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        if self.done {
            return;
        }
        let mut predicate = self.predicate.lock();
        let mut kept = Vec::with_capacity(items.len());
        let mut stop = false;
        for item in items {
            if predicate(item) {
                kept.push(item.clone());
            } else {
                stop = true;
                break;
            }
        }
        drop(predicate);
        if !kept.is_empty() {
            self.downstream.on_next(&kept);
        }
        if stop {
            self.done = true;
            if let Some(subscription) = &self.subscription {
                subscription.cancel();
            }
            self.downstream.on_complete();
        }
    }

    fn on_complete(&mut self) {
        if !self.done {
            self.done = true;
            self.downstream.on_complete();
        }
    }

    fn on_error(&mut self, error: FlowError) {
        if !self.done {
            self.done = true;
            self.downstream.on_error(error);
        }
    }
}

/// Drop the first `n` items, forwarding the rest unchanged.
pub fn skip<T>(upstream: BoxObservable<T>, n: u64) -> BoxObservable<T>
where
    T: Clone + Send + 'static,
{
    let remaining = Arc::new(AtomicU64::new(n));
    Box::new(FnObservable::new(upstream, move |items: &[T], downstream: &mut dyn Observer<T>| {
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            let before = remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| {
                if r == 0 {
                    None
                } else {
                    Some(r - 1)
                }
            });
            if before.is_err() {
                kept.push(item.clone());
            }
        }
        if !kept.is_empty() {
            downstream.on_next(&kept);
        }
    }))
}

/// Suppress consecutive duplicates (§4.8 — adjacent-repeat suppression,
/// not full-history distinctness).
pub fn distinct<T>(upstream: BoxObservable<T>) -> BoxObservable<T>
where
    T: Clone + Send + PartialEq + 'static,
{
    let last = Arc::new(Mutex::new(None::<T>));
    Box::new(FnObservable::new(upstream, move |items: &[T], downstream: &mut dyn Observer<T>| {
        let mut guard = last.lock();
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if guard.as_ref() != Some(item) {
                kept.push(item.clone());
                *guard = Some(item.clone());
            }
        }
        drop(guard);
        if !kept.is_empty() {
            downstream.on_next(&kept);
        }
    }))
}

/// Emit a running total on every upstream batch (§4.8).
pub fn sum<T>(upstream: BoxObservable<T>) -> BoxObservable<T>
where
    T: Clone + Send + std::ops::Add<Output = T> + 'static,
{
    let total = Arc::new(Mutex::new(None::<T>));
    Box::new(FnObservable::new(upstream, move |items: &[T], downstream: &mut dyn Observer<T>| {
        let mut guard = total.lock();
        for item in items {
            let next = match guard.take() {
                Some(current) => current + item.clone(),
                None => item.clone(),
            };
            *guard = Some(next);
        }
        if let Some(current) = guard.as_ref() {
            downstream.on_next(std::slice::from_ref(current));
        }
    }))
}

/// Map each upstream item to zero-or-one downstream item (§4.8's
/// `flat_map_optional`).
pub fn flat_map_optional<T, U, F>(upstream: BoxObservable<T>, mut f: F) -> BoxObservable<U>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Option<U> + Send + 'static,
{
    Box::new(FnObservable::new(upstream, move |items: &[T], downstream: &mut dyn Observer<U>| {
        let mapped: Vec<U> = items.iter().cloned().filter_map(&mut f).collect();
        if !mapped.is_empty() {
            downstream.on_next(&mapped);
        }
    }))
}

/// Map each upstream item to an inner observable and forward every
/// inner item downstream, subscribing to each inner source as soon as
/// it is produced (§4.8). Inner sources complete independently; the
/// flattened observable completes once upstream and every spawned
/// inner source have completed.
pub fn flat_map<T, U, F>(upstream: BoxObservable<T>, f: F) -> BoxObservable<U>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> BoxObservable<U> + Send + Sync + 'static,
{
    Box::new(super::combine::FlattenObservable::new(upstream, f, false))
}

/// Like [`flat_map`], but inner observables are subscribed to strictly
/// one at a time, in upstream order (§4.8's `concat_map`).
pub fn concat_map<T, U, F>(upstream: BoxObservable<T>, f: F) -> BoxObservable<U>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> BoxObservable<U> + Send + Sync + 'static,
{
    Box::new(super::combine::FlattenObservable::new(upstream, f, true))
}

/// A thin passthrough `Observable` that runs `transform` over each
/// `on_next` batch and forwards everything else (`on_subscribe`,
/// `on_complete`, `on_error`) unchanged — the common shape behind most
/// of this module's stateless operators.
struct FnObservable<T, U, F> {
    upstream: BoxObservable<T>,
    transform: F,
    _marker: std::marker::PhantomData<U>,
}

impl<T, U, F> FnObservable<T, U, F>
where
    F: FnMut(&[T], &mut dyn Observer<U>) + Send,
{
    fn new(upstream: BoxObservable<T>, transform: F) -> Self {
        Self {
            upstream,
            transform,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, U, F> Observable<U> for FnObservable<T, U, F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(&[T], &mut dyn Observer<U>) + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, downstream: BoxObserver<U>) -> Disposable {
        let observer = Box::new(FnObserver {
            downstream,
            transform: self.transform,
        });
        self.upstream.subscribe(coordinator, observer)
    }
}

struct FnObserver<T, U, F> {
    downstream: BoxObserver<U>,
    transform: F,
}

impl<T, U, F> Observer<T> for FnObserver<T, U, F>
where
    T: Send,
    U: Send,
    F: FnMut(&[T], &mut dyn Observer<U>) + Send,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        (self.transform)(items, self.downstream.as_mut());
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }

    fn on_error(&mut self, error: FlowError) {
        self.downstream.on_error(error);
    }
}

/// Like `FnObservable`, but the per-subscription `Observer` is built by
/// a factory rather than shared — used by operators (`take`,
/// `take_while`) that carry per-subscription state beyond a simple
/// transform closure.
struct StatefulObservable<T, U, G> {
    upstream: BoxObservable<T>,
    make_observer: G,
}

impl<T, U, G> Observable<U> for StatefulObservable<T, U, G>
where
    T: Send + 'static,
    U: Send + 'static,
    G: Fn(BoxObserver<U>) -> BoxObserver<T> + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, downstream: BoxObserver<U>) -> Disposable {
        let observer = (self.make_observer)(downstream);
        self.upstream.subscribe(coordinator, observer)
    }
}
