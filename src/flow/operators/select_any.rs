//! `select_any`: race `branches` against each other and resolve with
//! whichever produces the first item (§5, spec's Open Questions).
//!
//! Modeled on the `select_any` over pending requests that
//! `actor::context::ActorContext::request` builds on: each branch here
//! is one pending response/flow, represented as a `BoxObservable<T>`
//! that emits at most once. The first branch to emit wins — its item
//! is forwarded downstream, every other branch is cancelled immediately,
//! and downstream completes. A branch that errors or completes without
//! ever emitting counts as a failed request; if every branch fails,
//! downstream receives `FlowError::AllRequestsFailed` (§7).
//!
//! Per the recorded design decision: a winning branch's success
//! cancels the remaining branches' subscriptions outright, which is
//! how their response timeouts get cancelled too (a timeout is just
//! another branch's terminal signal).

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::flow::coordinator::Coordinator;
use crate::flow::disposable::{make_composite, Disposable};
use crate::flow::error::FlowError;
use crate::flow::observable::{BoxObservable, BoxObserver, Observable, Observer};
use crate::flow::subscription::Subscription;

struct SelectState<T> {
    downstream: Mutex<BoxObserver<T>>,
    remaining: AtomicUsize,
    resolved: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<T: Clone + Send> SelectState<T> {
    fn cancel_all(&self) {
        for subscription in self.subscriptions.lock().iter() {
            subscription.cancel();
        }
    }

    fn win(&self, item: T) {
        if self.resolved.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel_all();
        let mut downstream = self.downstream.lock();
        downstream.on_next(std::slice::from_ref(&item));
        downstream.on_complete();
    }

    fn branch_failed(&self) {
        if self.resolved.load(Ordering::Acquire) {
            return;
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 && !self.resolved.swap(true, Ordering::AcqRel) {
            self.downstream.lock().on_error(FlowError::AllRequestsFailed);
        }
    }
}

struct BranchObserver<T> {
    state: Arc<SelectState<T>>,
    won: bool,
}

impl<T: Clone + Send> Observer<T> for BranchObserver<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(1);
        self.state.subscriptions.lock().push(subscription);
    }

    fn on_next(&mut self, items: &[T]) {
        if let Some(item) = items.first() {
            self.won = true;
            self.state.win(item.clone());
        }
    }

    fn on_complete(&mut self) {
        if !self.won {
            self.state.branch_failed();
        }
    }

    fn on_error(&mut self, _error: FlowError) {
        self.state.branch_failed();
    }
}

struct SelectObservable<T> {
    branches: Vec<BoxObservable<T>>,
}

impl<T> Observable<T> for SelectObservable<T>
where
    T: Clone + Send + 'static,
{
    fn subscribe(self: Box<Self>, coordinator: &Coordinator, downstream: BoxObserver<T>) -> Disposable {
        if self.branches.is_empty() {
            let mut downstream = downstream;
            downstream.on_subscribe(Subscription::already_cancelled());
            downstream.on_error(FlowError::AllRequestsFailed);
            return Disposable::noop();
        }

        let state = Arc::new(SelectState {
            downstream: Mutex::new(downstream),
            remaining: AtomicUsize::new(self.branches.len()),
            resolved: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::with_capacity(self.branches.len())),
        });

        let mut disposables = Vec::with_capacity(self.branches.len());
        for branch in self.branches {
            let observer = Box::new(BranchObserver {
                state: state.clone(),
                won: false,
            });
            disposables.push(branch.subscribe(coordinator, observer));
        }

        make_composite(disposables)
    }
}

/// Race `branches` against each other (§5). The first to emit wins and
/// cancels the rest; if every branch fails without ever emitting,
/// downstream sees `FlowError::AllRequestsFailed`.
pub fn select_any<T>(branches: Vec<BoxObservable<T>>) -> BoxObservable<T>
where
    T: Clone + Send + 'static,
{
    Box::new(SelectObservable { branches })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::flow::operators::sources::{fail, just, never};
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
    fn first_success_wins_and_completes() {
        let (items, completed, error) = run_collect(select_any(vec![never(), just(42), never()]));
        assert_eq!(items, vec![42]);
        assert!(completed);
        assert!(error.is_none());
    }

    #[test]
    fn all_failing_resolves_all_requests_failed() {
        let (items, completed, error) = run_collect(select_any(vec![
            fail(FlowError::RuntimeError("a".into())),
            fail(FlowError::RuntimeError("b".into())),
        ]));
        assert!(items.is_empty());
        assert!(!completed);
        assert!(matches!(error, Some(FlowError::AllRequestsFailed)));
    }

    #[test]
    fn empty_branch_list_fails_immediately() {
        let (items, completed, error) = run_collect(select_any(Vec::new()));
        assert!(items.is_empty());
        assert!(!completed);
        assert!(matches!(error, Some(FlowError::AllRequestsFailed)));
    }
}
