//! `Disposable`: a uniform, cheaply-cloneable handle for cancelable
//! resources (§4.5). `dispose()` is idempotent; `is_disposed()` is
//! monotone false→true (testable property 7).
//!
//! Three concrete flavors are provided: a bare boolean [`flag`], a
//! [`composite`] that disposes every child and reports disposed iff
//! all children do (property 8), and a [`counted`] handle that hands
//! out accounted children and only disposes its inner resource once
//! every outstanding child has been disposed, or disposes it
//! immediately when the counted handle itself is disposed directly
//! (property 9, scenario S6).

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
// (none)

/// What a concrete disposable implementation must provide.
trait DisposableInner: Send + Sync {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
}

/// Implemented by a custom resource (typically an operator's own
/// subscription/driver state) that wants to present itself as a
/// [`Disposable`] directly, instead of going through
/// [`make_flag`]/[`make_composite`]/[`CountedDisposable`].
pub trait DisposableSource: Send + Sync {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
}

impl<T: DisposableSource> DisposableInner for T {
    fn dispose(&self) {
        DisposableSource::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        DisposableSource::is_disposed(self)
    }
}

/// A shared handle to a cancelable resource. Clones share the same
/// underlying state — disposing any clone disposes all of them.
#[derive(Clone)]
pub struct Disposable(Arc<dyn DisposableInner>);

impl Disposable {
    fn wrap(inner: Arc<dyn DisposableInner>) -> Self {
        Self(inner)
    }

    /// Cancel the underlying resource. Idempotent — a second call is
    /// a no-op.
    pub fn dispose(&self) {
        self.0.dispose();
    }

    /// Whether this resource has been disposed. Once true, never
    /// again false.
    pub fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }

    /// A disposable that reports disposed immediately and whose
    /// `dispose()` is a no-op — used where a caller needs a handle but
    /// there is genuinely nothing to cancel (e.g. an already-completed
    /// subscription).
    pub fn noop() -> Self {
        let flag = make_flag();
        flag.dispose();
        flag
    }

    /// Wrap a custom [`DisposableSource`] (e.g. an operator's own
    /// subscription/driver state) as a `Disposable`.
    pub fn from_source<T: DisposableSource + 'static>(source: Arc<T>) -> Self {
        Self::wrap(source)
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

struct Flag(AtomicBool);

impl DisposableInner for Flag {
    fn dispose(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A plain boolean-flag disposable (§4.5 `make_flag`).
pub fn make_flag() -> Disposable {
    Disposable::wrap(Arc::new(Flag(AtomicBool::new(false))))
}

struct Composite {
    children: Mutex<Vec<Disposable>>,
}

impl DisposableInner for Composite {
    fn dispose(&self) {
        for child in self.children.lock().iter() {
            child.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.children.lock().iter().all(Disposable::is_disposed)
    }
}

/// A disposable that disposes every entry in `children` when
/// disposed, and reports disposed iff every entry does (§4.5, property
/// 8). Vacuously disposed for an empty vector.
pub fn make_composite(children: Vec<Disposable>) -> Disposable {
    Disposable::wrap(Arc::new(Composite {
        children: Mutex::new(children),
    }))
}

struct CountedState {
    inner: Disposable,
    outstanding: AtomicUsize,
    disposed_directly: AtomicBool,
}

struct CountedChild {
    state: Arc<CountedState>,
    fired: AtomicBool,
}

impl DisposableInner for CountedChild {
    fn dispose(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.state.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.inner.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

struct CountedHandle(Arc<CountedState>);

impl DisposableInner for CountedHandle {
    fn dispose(&self) {
        self.0.disposed_directly.store(true, Ordering::Release);
        self.0.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.0.inner.is_disposed()
    }
}

/// A handle that hands out accounted "nested" children (§4.5
/// `counted_disposable`). `inner` is disposed once every acquired
/// child has been disposed and the outstanding count returns to zero,
/// or immediately if the counted handle itself is disposed directly.
#[derive(Clone)]
pub struct CountedDisposable {
    state: Arc<CountedState>,
}

impl CountedDisposable {
    pub fn new(inner: Disposable) -> Self {
        Self {
            state: Arc::new(CountedState {
                inner,
                outstanding: AtomicUsize::new(0),
                disposed_directly: AtomicBool::new(false),
            }),
        }
    }

    /// Hand out a new accounted child. If the counted handle has
    /// already been disposed directly, the child is returned
    /// pre-disposed (a no-op acquire).
    pub fn acquire(&self) -> Disposable {
        if self.state.disposed_directly.load(Ordering::Acquire) {
            return Disposable::noop();
        }
        self.state.outstanding.fetch_add(1, Ordering::AcqRel);
        Disposable::wrap(Arc::new(CountedChild {
            state: self.state.clone(),
            fired: AtomicBool::new(false),
        }))
    }

    /// A `Disposable` view of the counted handle itself: disposing it
    /// disposes `inner` unconditionally, regardless of outstanding
    /// children.
    pub fn handle(&self) -> Disposable {
        Disposable::wrap(Arc::new(CountedHandle(self.state.clone())))
    }

    pub fn is_disposed(&self) -> bool {
        self.state.inner.is_disposed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_monotone() {
        let d = make_flag();
        assert!(!d.is_disposed());
        d.dispose();
        assert!(d.is_disposed());
        d.dispose();
        assert!(d.is_disposed());
    }

    #[test]
    fn clones_share_state() {
        let d = make_flag();
        let clone = d.clone();
        clone.dispose();
        assert!(d.is_disposed());
    }

    #[test]
    fn composite_disposed_iff_all_children_disposed() {
        let a = make_flag();
        let b = make_flag();
        let composite = make_composite(vec![a.clone(), b.clone()]);
        assert!(!composite.is_disposed());
        a.dispose();
        assert!(!composite.is_disposed());
        b.dispose();
        assert!(composite.is_disposed());
    }

    #[test]
    fn composite_dispose_cascades_to_children() {
        let a = make_flag();
        let b = make_flag();
        let composite = make_composite(vec![a.clone(), b.clone()]);
        composite.dispose();
        assert!(a.is_disposed());
        assert!(b.is_disposed());
    }

    #[test]
    fn empty_composite_is_vacuously_disposed() {
        let composite = make_composite(vec![]);
        assert!(composite.is_disposed());
    }

    #[test]
    fn counted_disposable_scenario_s6() {
        let inner = make_flag();
        let counted = CountedDisposable::new(inner.clone());
        let a = counted.acquire();
        let b = counted.acquire();
        let c = counted.acquire();

        a.dispose();
        b.dispose();
        assert!(!inner.is_disposed());

        c.dispose();
        assert!(inner.is_disposed());
    }

    #[test]
    fn counted_disposable_direct_dispose_ignores_outstanding() {
        let inner = make_flag();
        let counted = CountedDisposable::new(inner.clone());
        let _a = counted.acquire();
        let _b = counted.acquire();

        counted.handle().dispose();
        assert!(inner.is_disposed());
    }

    #[test]
    fn acquire_after_direct_dispose_is_noop() {
        let inner = make_flag();
        let counted = CountedDisposable::new(inner);
        counted.handle().dispose();
        let child = counted.acquire();
        assert!(child.is_disposed());
        child.dispose();
    }
}
