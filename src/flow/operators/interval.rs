//! `interval`/`timer`: monotonically increasing integers driven by a
//! `Coordinator`'s clock (§4.8, testable property 15 "timer fairness").
//!
//! `interval(d0, dp)` never completes on its own — pair with `take(n)`
//! to bound it. `timer(d)` is `interval` specialized to a single tick:
//! `take(interval(d, d), 1)`.
//!
//! Respecting back-pressure here means a tick that lands with zero
//! outstanding demand is dropped rather than buffered — the item is
//! lost, but the schedule itself is unaffected, so once demand resumes
//! consecutive emissions are still spaced at least `dp` apart on the
//! steady clock (the fairness property only constrains spacing between
//! emitted items, not between ticks).

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::{Disposable, DisposableSource};
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::{DemandCounter, Subscription, SubscriptionImpl};
use crate::flow::operators::transform::take;

struct IntervalState {
    observer: Mutex<BoxObserver<i64>>,
    demand: DemandCounter,
    next_value: AtomicI64,
    done: AtomicBool,
}

struct IntervalSubscriptionImpl {
    state: Arc<IntervalState>,
}

impl SubscriptionImpl for IntervalSubscriptionImpl {
    fn request(&self, n: u64) {
        self.state.demand.add(n);
    }

    fn cancel(&self) {
        self.state.demand.cancel();
        self.state.done.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.state.demand.is_cancelled()
    }
}

struct IntervalDisposable {
    state: Arc<IntervalState>,
}

impl DisposableSource for IntervalDisposable {
    fn dispose(&self) {
        self.state.demand.cancel();
        self.state.done.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.state.done.load(Ordering::Acquire) || self.state.demand.is_cancelled()
    }
}

struct IntervalObservable {
    initial_delay: Duration,
    period: Duration,
}

impl Observable<i64> for IntervalObservable {
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, observer: BoxObserver<i64>) -> Disposable {
        let state = Arc::new(IntervalState {
            observer: Mutex::new(observer),
            demand: DemandCounter::new(),
            next_value: AtomicI64::new(0),
            done: AtomicBool::new(false),
        });
        let subscription = Subscription::new(Arc::new(IntervalSubscriptionImpl { state: state.clone() }));
        state.observer.lock().on_subscribe(subscription);

        let disposable = Disposable::from_source(Arc::new(IntervalDisposable { state: state.clone() }));
        coordinator.watch(disposable.clone());

        schedule_tick(coordinator.clone(), state, self.initial_delay, self.period);
        disposable
    }
}

fn schedule_tick(coordinator: Coordinator, state: Arc<IntervalState>, delay: Duration, period: Duration) {
    if state.done.load(Ordering::Acquire) || state.demand.is_cancelled() {
        return;
    }
    coordinator.delay_for(
        delay,
        Box::new(move |c| {
            if state.done.load(Ordering::Acquire) || state.demand.is_cancelled() {
                return;
            }
            if state.demand.take(1) == 1 {
                let value = state.next_value.fetch_add(1, Ordering::AcqRel);
                state.observer.lock().on_next(std::slice::from_ref(&value));
            }
            schedule_tick(c.clone(), state, period, period);
        }),
    );
}

/// Emit `0, 1, 2, ...` on the steady clock: the first tick after
/// `initial_delay`, then every `period` thereafter. Never completes on
/// its own (§4.8) — pair with `take(n)` to bound it.
pub fn interval(initial_delay: Duration, period: Duration) -> BoxObservable<i64> {
    Box::new(IntervalObservable { initial_delay, period })
}

/// Emit a single `0` after `delay`, then complete (§4.8).
pub fn timer(delay: Duration) -> BoxObservable<i64> {
    take(interval(delay, delay), 1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering as StdOrdering;
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
            self.completed.store(true, StdOrdering::SeqCst);
        }

        fn on_error(&mut self, _error: crate::flow::error::FlowError) {}
    }

    #[test]
    fn interval_emits_increasing_values_spaced_by_period() {
        let coordinator = Coordinator::with_system_clock();
        let items = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(AtomicBool::new(false));
        let observer = Box::new(CollectingObserver {
            items: items.clone(),
            completed: completed.clone(),
        });

        let bounded = take(interval(Duration::from_millis(1), Duration::from_millis(1)), 5);
        let _disposable = bounded.subscribe(&coordinator, observer);

        for _ in 0..1000 {
            coordinator.run_some(8);
            if completed.load(StdOrdering::SeqCst) {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(*items.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(completed.load(StdOrdering::SeqCst));
    }

    #[test]
    fn timer_emits_once_then_completes() {
        let coordinator = Coordinator::with_system_clock();
        let items = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(AtomicBool::new(false));
        let observer = Box::new(CollectingObserver {
            items: items.clone(),
            completed: completed.clone(),
        });

        let _disposable = timer(Duration::from_millis(1)).subscribe(&coordinator, observer);

        for _ in 0..1000 {
            coordinator.run_some(8);
            if completed.load(StdOrdering::SeqCst) {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(*items.lock().unwrap(), vec![0]);
        assert!(completed.load(StdOrdering::SeqCst));
    }
}
