//! `observe_on`: bridge items across `Coordinator`s via an SPSC buffer
//! (§4.8, §4.6). The upstream observable runs wherever it is
//! subscribed; every item it produces crosses into `target`'s
//! execution context through an [`AsyncProducer`]/[`AsyncConsumer`]
//! pair before reaching the downstream observer, which always runs on
//! `target`.
//!
//! Demand flows the other way: `observe_on` only ever requests as much
//! from upstream as the buffer currently has room for, replenishing
//! that request whenever the consumer side drains space (§4.8's
//! "requests from upstream based on downstream demand and buffer
//! capacity").

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::buffer::{channel, AsyncConsumer, AsyncProducer, PullOutcome, PullPolicy};
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::Disposable;
use crate::flow::error::FlowError;
use crate::flow::observable::{subscribe_pull, BoxObservable, BoxObserver, Observable, Observer, PullSource};
use crate::flow::subscription::Subscription;
use crate::system::config::DEFAULT_FLOW_BATCH_SIZE;

struct BridgeState {
    capacity: usize,
    subscription: Mutex<Option<Subscription>>,
}

struct UpstreamObserver<T> {
    producer: AsyncProducer<T>,
    state: Arc<BridgeState>,
}

impl<T: Clone + Send> Observer<T> for UpstreamObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(self.state.capacity as u64);
        *self.state.subscription.lock() = Some(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        // Correct by the request-N protocol: upstream never delivers
        // more than was granted, and we only ever grant as much as the
        // buffer has free room for, so every push here should land.
        for item in items {
            self.producer.push(item.clone());
        }
    }

    fn on_complete(&mut self) {
        self.producer.close();
    }

    fn on_error(&mut self, error: FlowError) {
        self.producer.close_with_error(error);
    }
}

struct ConsumerSource<T> {
    consumer: AsyncConsumer<T>,
}

impl<T: Clone + Send> PullSource<T> for ConsumerSource<T> {
    fn poll(&mut self, max: u64, observer: &mut dyn Observer<T>) -> (u64, bool) {
        match self.consumer.pull(PullPolicy::DrainFirst, max as usize) {
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

struct ObserveOnObservable<T> {
    upstream: BoxObservable<T>,
    target: Coordinator,
    capacity: usize,
    min_request: usize,
}

impl<T: Clone + Send + 'static> Observable<T> for ObserveOnObservable<T> {
    fn subscribe(self: Box<Self>, origin: &Coordinator, downstream: BoxObserver<T>) -> Disposable {
        let (consumer, producer) = channel::<T>(self.capacity, self.min_request);
        let state = Arc::new(BridgeState {
            capacity: self.capacity,
            subscription: Mutex::new(None),
        });

        let replenish_state = state.clone();
        let replenish_producer_probe = producer.clone();
        producer.set_waker(Arc::new(move || {
            let free = replenish_state
                .capacity
                .saturating_sub(replenish_producer_probe.buffered_len());
            if free == 0 {
                return;
            }
            if let Some(subscription) = replenish_state.subscription.lock().as_ref() {
                subscription.request(free as u64);
            }
        }));

        let observer = Box::new(UpstreamObserver {
            producer,
            state: state.clone(),
        });
        let upstream_disposable = self.upstream.subscribe(origin, observer);

        let source = Box::new(ConsumerSource { consumer });
        let downstream_disposable = subscribe_pull(&self.target, downstream, source, DEFAULT_FLOW_BATCH_SIZE as u64);

        crate::flow::disposable::make_composite(vec![upstream_disposable, downstream_disposable])
    }
}

/// Bridge `upstream` onto `target`'s coordinator, sized by `capacity`
/// (the SPSC buffer's slot count) and `min_request` (how many buffered
/// items must accumulate before the consumer side is woken — see
/// [`AsyncConsumer`]) (§4.8).
pub fn observe_on<T: Clone + Send + 'static>(
    upstream: BoxObservable<T>,
    target: Coordinator,
    capacity: usize,
    min_request: usize,
) -> BoxObservable<T> {
    Box::new(ObserveOnObservable {
        upstream,
        target,
        capacity: capacity.max(1),
        min_request,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::flow::operators::sources::range;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    struct CollectingObserver {
        items: Arc<StdMutex<Vec<i64>>>,
        completed: Arc<AtomicBool>,
    }

    impl Observer<i64> for CollectingObserver {
        fn on_subscribe(&mut self, subscription: Subscription) {
            subscription.request(u64::MAX);
        }

        fn on_next(&mut self, items: &[i64]) {
            self.items.lock().unwrap().extend_from_slice(items);
        }

        fn on_complete(&mut self) {
            self.completed.store(true, Ordering::SeqCst);
        }

        fn on_error(&mut self, _error: FlowError) {}
    }

    #[test]
    fn items_cross_into_target_coordinator() {
        let origin = Coordinator::with_system_clock();
        let target = Coordinator::with_system_clock();
        let items = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(AtomicBool::new(false));
        let observer = Box::new(CollectingObserver {
            items: items.clone(),
            completed: completed.clone(),
        });

        let bridged = observe_on(range(0, 20), target.clone(), 4, 1);
        let _disposable = bridged.subscribe(&origin, observer);

        for _ in 0..1000 {
            origin.run_some(1);
            target.run_some(1);
            if completed.load(Ordering::SeqCst) {
                break;
            }
        }

        assert_eq!(*items.lock().unwrap(), (0..20).collect::<Vec<_>>());
        assert!(completed.load(Ordering::SeqCst));
    }
}
