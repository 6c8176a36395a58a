//! Observable sources: `range`, `iota`, `just`, `empty`, `never`,
//! `fail`, `from_container`, `from_callable`, `from_generator`,
//! `repeat`, `defer`, `from_resource` (§4.8).
//!
//! Every source except `defer`/`from_resource` is built the same way:
//! a [`PullSource`] is constructed fresh on each `subscribe` call (cold
//! semantics, §4.7) and driven through [`subscribe_pull`].

// Layer 1: Standard library imports
use std::marker::PhantomData;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::flow::buffer::{AsyncConsumer, PullOutcome, PullPolicy};
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::Disposable;
use crate::flow::error::FlowError;
use crate::flow::observable::{subscribe_pull, BoxObservable, BoxObserver, Observable, Observer, PullSource};
use crate::system::config::DEFAULT_FLOW_BATCH_SIZE;

struct FromPull<T, F> {
    factory: F,
    batch: u64,
    _marker: PhantomData<T>,
}

impl<T, F> Observable<T> for FromPull<T, F>
where
    T: Send + 'static,
    F: FnOnce() -> Box<dyn PullSource<T>> + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable {
        let source = (self.factory)();
        subscribe_pull(coordinator, observer, source, self.batch)
    }
}

fn from_pull<T, F>(batch: u64, factory: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: FnOnce() -> Box<dyn PullSource<T>> + Send + 'static,
{
    Box::new(FromPull {
        factory,
        batch,
        _marker: PhantomData,
    })
}

struct RangeSource {
    current: i64,
    end: i64,
}

impl PullSource<i64> for RangeSource {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<i64>) -> (u64, bool) {
        let mut batch = Vec::new();
        let mut emitted = 0u64;
        while emitted < max && self.current < self.end {
            batch.push(self.current);
            self.current += 1;
            emitted += 1;
        }
        if !batch.is_empty() {
            observer.on_next(&batch);
        }
        let finished = self.current >= self.end;
        if finished {
            observer.on_complete();
        }
        (emitted, finished)
    }
}

/// Emit every integer in `[start, end)`, then complete. Empty if
/// `start >= end`.
pub fn range(start: i64, end: i64) -> BoxObservable<i64> {
    from_pull(DEFAULT_FLOW_BATCH_SIZE as u64, move || {
        Box::new(RangeSource { current: start, end }) as Box<dyn PullSource<i64>>
    })
}

struct IotaSource {
    current: i64,
    step: i64,
}

impl PullSource<i64> for IotaSource {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<i64>) -> (u64, bool) {
        let mut batch = Vec::with_capacity(max as usize);
        for _ in 0..max {
            batch.push(self.current);
            self.current += self.step;
        }
        if !batch.is_empty() {
            observer.on_next(&batch);
        }
        (batch.len() as u64, false)
    }
}

/// An unbounded, monotonically increasing sequence starting at `start`
/// and advancing by `step` each item. Never completes on its own —
/// pair with `take`/`take_while` to bound it (§4.8).
pub fn iota(start: i64, step: i64) -> BoxObservable<i64> {
    from_pull(DEFAULT_FLOW_BATCH_SIZE as u64, move || {
        Box::new(IotaSource { current: start, step }) as Box<dyn PullSource<i64>>
    })
}

struct JustSource<T> {
    value: Option<T>,
}

impl<T: Send> PullSource<T> for JustSource<T> {
    fn poll(&mut self, _max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        match self.value.take() {
            Some(value) => {
                observer.on_next(std::slice::from_ref(&value));
                observer.on_complete();
                (1, true)
            }
            None => (0, true),
        }
    }
}

/// Emit exactly one item, then complete (§4.8).
pub fn just<T: Send + Clone + 'static>(value: T) -> BoxObservable<T> {
    from_pull(1, move || Box::new(JustSource { value: Some(value) }) as Box<dyn PullSource<T>>)
}

struct EmptySource;

impl<T: Send> PullSource<T> for EmptySource {
    fn poll(&mut self, _max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        observer.on_complete();
        (0, true)
    }
}

/// Complete immediately without emitting any items.
pub fn empty<T: Send + 'static>() -> BoxObservable<T> {
    from_pull(1, || Box::new(EmptySource) as Box<dyn PullSource<T>>)
}

struct NeverSource;

impl<T: Send> PullSource<T> for NeverSource {
    fn poll(&mut self, _max: u64, _observer: &mut dyn Observer<T>) -> (u64, bool) {
        (0, false)
    }
}

/// Neither emit nor complete nor error — useful as a test fixture and
/// as a `select_any`/`merge` branch that should never win (§4.8).
pub fn never<T: Send + 'static>() -> BoxObservable<T> {
    from_pull(1, || Box::new(NeverSource) as Box<dyn PullSource<T>>)
}

struct FailSource {
    error: Option<FlowError>,
}

impl<T: Send> PullSource<T> for FailSource {
    fn poll(&mut self, _max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        let error = self
            .error
            .take()
            .unwrap_or_else(|| FlowError::RuntimeError("fail() observable polled twice".into()));
        observer.on_error(error);
        (0, true)
    }
}

/// Error immediately with `error`, without emitting any items (§4.8).
pub fn fail<T: Send + 'static>(error: FlowError) -> BoxObservable<T> {
    from_pull(1, move || Box::new(FailSource { error: Some(error) }) as Box<dyn PullSource<T>>)
}

struct ContainerSource<T> {
    items: std::vec::IntoIter<T>,
}

impl<T: Send> PullSource<T> for ContainerSource<T> {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        let mut batch = Vec::new();
        for _ in 0..max {
            match self.items.next() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        let emitted = batch.len() as u64;
        if !batch.is_empty() {
            observer.on_next(&batch);
        }
        let finished = self.items.len() == 0;
        if finished {
            observer.on_complete();
        }
        (emitted, finished)
    }
}

/// Emit every element of `items` in order, then complete (§4.8).
pub fn from_container<T: Send + 'static>(items: Vec<T>) -> BoxObservable<T> {
    from_pull(DEFAULT_FLOW_BATCH_SIZE as u64, move || {
        Box::new(ContainerSource { items: items.into_iter() }) as Box<dyn PullSource<T>>
    })
}

struct CallableSource<F> {
    callable: Option<F>,
}

impl<T, F> PullSource<T> for CallableSource<F>
where
    T: Send,
    F: FnOnce() -> Result<T, FlowError> + Send,
{
    fn poll(&mut self, _max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        match self.callable.take() {
            Some(callable) => match callable() {
                Ok(value) => {
                    observer.on_next(std::slice::from_ref(&value));
                    observer.on_complete();
                    (1, true)
                }
                Err(error) => {
                    observer.on_error(error);
                    (0, true)
                }
            },
            None => (0, true),
        }
    }
}

/// Lazily compute a single item by calling `callable` once per
/// subscriber (§4.8) — `empty`/`just`/`fail` unified behind one
/// fallible closure.
pub fn from_callable<T, F>(callable: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FlowError> + Send + 'static,
{
    from_pull(1, move || {
        Box::new(CallableSource { callable: Some(callable) }) as Box<dyn PullSource<T>>
    })
}

struct GeneratorSource<F> {
    generator: F,
}

impl<T, F> PullSource<T> for GeneratorSource<F>
where
    T: Send,
    F: FnMut() -> Option<T> + Send,
{
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        let mut batch = Vec::new();
        let mut finished = false;
        for _ in 0..max {
            match (self.generator)() {
                Some(item) => batch.push(item),
                None => {
                    finished = true;
                    break;
                }
            }
        }
        let emitted = batch.len() as u64;
        if !batch.is_empty() {
            observer.on_next(&batch);
        }
        if finished {
            observer.on_complete();
        }
        (emitted, finished)
    }
}

/// Repeatedly call `generator`, emitting each `Some(item)` until it
/// returns `None`, which completes the observable (§4.8).
pub fn from_generator<T, F>(generator: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: FnMut() -> Option<T> + Send + 'static,
{
    from_pull(DEFAULT_FLOW_BATCH_SIZE as u64, move || {
        Box::new(GeneratorSource { generator }) as Box<dyn PullSource<T>>
    })
}

struct RepeatSource<T> {
    value: T,
    remaining: Option<u64>,
}

impl<T: Clone + Send> PullSource<T> for RepeatSource<T> {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        let to_emit = match self.remaining {
            Some(remaining) => remaining.min(max),
            None => max,
        };
        if to_emit == 0 {
            observer.on_complete();
            return (0, true);
        }
        let batch = vec![self.value.clone(); to_emit as usize];
        observer.on_next(&batch);
        if let Some(remaining) = &mut self.remaining {
            *remaining -= to_emit;
        }
        let finished = matches!(self.remaining, Some(0));
        if finished {
            observer.on_complete();
        }
        (to_emit, finished)
    }
}

/// Emit `value` repeatedly, `count` times if given, or forever if
/// `None` (§4.8).
pub fn repeat<T: Clone + Send + 'static>(value: T, count: Option<u64>) -> BoxObservable<T> {
    from_pull(DEFAULT_FLOW_BATCH_SIZE as u64, move || {
        Box::new(RepeatSource {
            value,
            remaining: count,
        }) as Box<dyn PullSource<T>>
    })
}

struct DeferObservable<T, F> {
    factory: F,
    _marker: PhantomData<T>,
}

impl<T, F> Observable<T> for DeferObservable<T, F>
where
    T: Send + 'static,
    F: FnOnce() -> BoxObservable<T> + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<T>) -> Disposable {
        let observable = (self.factory)();
        observable.subscribe(coordinator, observer)
    }
}

/// Build a fresh inner observable for every subscriber, via `factory`
/// (§4.8) — the escape hatch for a source whose identity must be
/// re-evaluated per subscription rather than captured once at
/// construction time.
pub fn defer<T, F>(factory: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: FnOnce() -> BoxObservable<T> + Send + 'static,
{
    Box::new(DeferObservable {
        factory,
        _marker: PhantomData,
    })
}

struct ResourceSource<T> {
    consumer: AsyncConsumer<T>,
    policy: PullPolicy,
}

impl<T: Send> PullSource<T> for ResourceSource<T> {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        match self.consumer.pull(self.policy, max as usize) {
            PullOutcome::Items(items) => {
                let emitted = items.len() as u64;
                if !items.is_empty() {
                    observer.on_next(&items);
                }
                (emitted, false)
            }
            PullOutcome::Complete(items) => {
                let emitted = items.len() as u64;
                if !items.is_empty() {
                    observer.on_next(&items);
                }
                observer.on_complete();
                (emitted, true)
            }
            PullOutcome::Error(items, error) => {
                let emitted = items.len() as u64;
                if !items.is_empty() {
                    observer.on_next(&items);
                }
                observer.on_error(error);
                (emitted, true)
            }
        }
    }
}

/// Adapt an [`AsyncConsumer`] opened from a
/// [`ConsumerResource`](crate::flow::buffer::ConsumerResource) into an
/// `Observable` (§4.6, §4.8). Fails with `FlowError::InvalidObservable`
/// if the resource was already opened (or is otherwise unavailable),
/// per §4.8's `from_resource` contract.
pub fn from_resource<T: Send + 'static>(
    resource: &crate::flow::buffer::ConsumerResource<T>,
    policy: PullPolicy,
) -> BoxObservable<T> {
    match resource.try_open() {
        Some(consumer) => from_pull(DEFAULT_FLOW_BATCH_SIZE as u64, move || {
            Box::new(ResourceSource { consumer, policy }) as Box<dyn PullSource<T>>
        }),
        None => fail(FlowError::InvalidObservable(
            "from_resource: consumer resource already opened or unavailable".into(),
        )),
    }
}
