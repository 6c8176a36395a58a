//! Tap operators: `do_on_complete`, `do_on_error`, `do_finally`,
//! `on_error_complete` (§6's flow API surface, §4.8). Each wraps the
//! downstream `Observer` to run a side effect (or rewrite a terminal
//! signal) without touching items in transit.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::Disposable;
use crate::flow::error::FlowError;
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::Subscription;

struct TapObservable<T, F> {
    upstream: BoxObservable<T>,
    make_observer: F,
}

impl<T, U, F> Observable<U> for TapObservable<T, F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(BoxObserver<U>) -> BoxObserver<T> + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, downstream: BoxObserver<U>) -> Disposable {
        let observer = (self.make_observer)(downstream);
        self.upstream.subscribe(coordinator, observer)
    }
}

struct OnCompleteObserver<T, F> {
    downstream: BoxObserver<T>,
    callback: Option<F>,
}

impl<T, F> Observer<T> for OnCompleteObserver<T, F>
where
    T: Send,
    F: FnOnce() + Send,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        self.downstream.on_next(items);
    }

    fn on_complete(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
        self.downstream.on_complete();
    }

    fn on_error(&mut self, error: FlowError) {
        self.downstream.on_error(error);
    }
}

/// Run `callback` exactly once, just before the downstream `on_complete`
/// fires. Never runs on an error path (§4.8).
pub fn do_on_complete<T, F>(upstream: BoxObservable<T>, callback: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: FnOnce() + Send + 'static,
{
    Box::new(TapObservable {
        upstream,
        make_observer: move |downstream: BoxObserver<T>| -> BoxObserver<T> {
            Box::new(OnCompleteObserver {
                downstream,
                callback: Some(callback),
            })
        },
    })
}

struct OnErrorObserver<T, F> {
    downstream: BoxObserver<T>,
    callback: Option<F>,
}

impl<T, F> Observer<T> for OnErrorObserver<T, F>
where
    T: Send,
    F: FnOnce(&FlowError) + Send,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        self.downstream.on_next(items);
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }

    fn on_error(&mut self, error: FlowError) {
        if let Some(callback) = self.callback.take() {
            callback(&error);
        }
        self.downstream.on_error(error);
    }
}

/// Run `callback` exactly once, just before the downstream `on_error`
/// fires. Never runs on the complete path (§4.8).
pub fn do_on_error<T, F>(upstream: BoxObservable<T>, callback: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: FnOnce(&FlowError) + Send + 'static,
{
    Box::new(TapObservable {
        upstream,
        make_observer: move |downstream: BoxObserver<T>| -> BoxObserver<T> {
            Box::new(OnErrorObserver {
                downstream,
                callback: Some(callback),
            })
        },
    })
}

struct FinallyObserver<T, F> {
    downstream: BoxObserver<T>,
    callback: Arc<F>,
    fired: Arc<AtomicBool>,
}

impl<T, F> FinallyObserver<T, F>
where
    F: Fn() + Send + Sync,
{
    fn fire_once(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            (self.callback)();
        }
    }
}

impl<T, F> Observer<T> for FinallyObserver<T, F>
where
    T: Send,
    F: Fn() + Send + Sync,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        self.downstream.on_next(items);
    }

    fn on_complete(&mut self) {
        self.fire_once();
        self.downstream.on_complete();
    }

    fn on_error(&mut self, error: FlowError) {
        self.fire_once();
        self.downstream.on_error(error);
    }
}

/// Run `callback` exactly once on either terminal path — completion or
/// error — whichever comes first (§4.8).
pub fn do_finally<T, F>(upstream: BoxObservable<T>, callback: F) -> BoxObservable<T>
where
    T: Send + 'static,
    F: Fn() + Send + Sync + 'static,
{
    let callback = Arc::new(callback);
    let fired = Arc::new(AtomicBool::new(false));
    Box::new(TapObservable {
        upstream,
        make_observer: move |downstream: BoxObserver<T>| -> BoxObserver<T> {
            Box::new(FinallyObserver {
                downstream,
                callback,
                fired,
            })
        },
    })
}

struct ErrorToCompleteObserver<T> {
    downstream: BoxObserver<T>,
}

impl<T: Send> Observer<T> for ErrorToCompleteObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        self.downstream.on_next(items);
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }

    fn on_error(&mut self, _error: FlowError) {
        self.downstream.on_complete();
    }
}

/// Rewrite any upstream error into an ordinary completion (§4.8) — the
/// boundary at which an error stops propagating further downstream.
pub fn on_error_complete<T: Send + 'static>(upstream: BoxObservable<T>) -> BoxObservable<T> {
    Box::new(TapObservable {
        upstream,
        make_observer: |downstream: BoxObserver<T>| -> BoxObserver<T> { Box::new(ErrorToCompleteObserver { downstream }) },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::flow::operators::sources::{fail, range};
    use std::sync::atomic::{AtomicBool as StdAtomicBool, Ordering as StdOrdering};
    use std::sync::Mutex as StdMutex;

    struct CollectingObserver {
        items: Arc<StdMutex<Vec<i64>>>,
        completed: Arc<StdAtomicBool>,
        errored: Arc<StdMutex<Option<FlowError>>>,
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

        fn on_error(&mut self, error: FlowError) {
            *self.errored.lock().unwrap() = Some(error);
        }
    }

    fn run_collect(observable: BoxObservable<i64>) -> (Vec<i64>, bool, Option<FlowError>) {
        let coordinator = Coordinator::with_system_clock();
        let items = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(StdAtomicBool::new(false));
        let errored = Arc::new(StdMutex::new(None));
        let observer = Box::new(CollectingObserver {
            items: items.clone(),
            completed: completed.clone(),
            errored: errored.clone(),
        });
        let _disposable = observable.subscribe(&coordinator, observer);
        coordinator.run();
        (
            items.lock().unwrap().clone(),
            completed.load(StdOrdering::SeqCst),
            errored.lock().unwrap().take(),
        )
    }

    #[test]
    fn do_on_complete_fires_before_downstream_complete() {
        let fired = Arc::new(StdAtomicBool::new(false));
        let fired_clone = fired.clone();
        let (items, completed, _) = run_collect(do_on_complete(range(0, 3), move || {
            fired_clone.store(true, StdOrdering::SeqCst);
        }));
        assert_eq!(items, vec![0, 1, 2]);
        assert!(completed);
        assert!(fired.load(StdOrdering::SeqCst));
    }

    #[test]
    fn do_on_complete_does_not_fire_on_error() {
        let fired = Arc::new(StdAtomicBool::new(false));
        let fired_clone = fired.clone();
        let (_, _, error) = run_collect(do_on_complete(fail(FlowError::RuntimeError("boom".into())), move || {
            fired_clone.store(true, StdOrdering::SeqCst);
        }));
        assert!(error.is_some());
        assert!(!fired.load(StdOrdering::SeqCst));
    }

    #[test]
    fn do_on_error_fires_with_the_error() {
        let seen = Arc::new(StdMutex::new(None));
        let seen_clone = seen.clone();
        let (_, _, error) = run_collect(do_on_error(fail(FlowError::RuntimeError("boom".into())), move |e| {
            *seen_clone.lock().unwrap() = Some(e.clone());
        }));
        assert!(error.is_some());
        assert!(seen.lock().unwrap().is_some());
    }

    #[test]
    fn do_finally_fires_on_either_terminal_path() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_clone = count.clone();
        run_collect(do_finally(range(0, 3), move || {
            count_clone.fetch_add(1, StdOrdering::SeqCst);
        }));
        assert_eq!(count.load(StdOrdering::SeqCst), 1);

        let count2 = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count2_clone = count2.clone();
        run_collect(do_finally(fail(FlowError::RuntimeError("boom".into())), move || {
            count2_clone.fetch_add(1, StdOrdering::SeqCst);
        }));
        assert_eq!(count2.load(StdOrdering::SeqCst), 1);
    }

    #[test]
    fn on_error_complete_turns_error_into_completion() {
        let (items, completed, error) = run_collect(on_error_complete(fail(FlowError::RuntimeError("boom".into()))));
        assert!(items.is_empty());
        assert!(completed);
        assert!(error.is_none());
    }
}
