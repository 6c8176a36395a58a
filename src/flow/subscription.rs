//! `Subscription`: the per-subscriber demand channel and cancellation
//! handle between an `Observable` and its `Observer` (§4.7).
//!
//! `request(n)` is additive — it never resets previously granted
//! demand — and `cancel()` is idempotent and terminal. Concrete
//! operators implement [`SubscriptionImpl`] to react to demand
//! changes; [`DemandCounter`] is the shared bookkeeping most of them
//! build on.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// What a concrete producer does when asked for more items or told to
/// stop.
pub trait SubscriptionImpl: Send + Sync {
    /// Grant `n` additional items of demand (saturating rather than
    /// overflowing).
    fn request(&self, n: u64);

    /// Cancel. Idempotent; no further items may be delivered after
    /// this returns, though some already in flight may still land.
    fn cancel(&self);

    /// Whether `cancel()` has been called.
    fn is_cancelled(&self) -> bool;
}

/// The handle an `Observer` receives from `on_subscribe` (§4.7).
/// Cheap to clone; every clone shares the same underlying demand
/// state.
#[derive(Clone)]
pub struct Subscription(Arc<dyn SubscriptionImpl>);

impl Subscription {
    pub fn new(inner: Arc<dyn SubscriptionImpl>) -> Self {
        Self(inner)
    }

    pub fn request(&self, n: u64) {
        self.0.request(n);
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// A subscription that is already cancelled and ignores
    /// `request` — handed to a redundant `on_subscribe` call per §4.7
    /// ("redundant subscriptions MUST be immediately disposed by the
    /// callee").
    pub fn already_cancelled() -> Self {
        let sub = DeadSubscription;
        Self(Arc::new(sub))
    }
}

struct DeadSubscription;

impl SubscriptionImpl for DeadSubscription {
    fn request(&self, _n: u64) {}
    fn cancel(&self) {}
    fn is_cancelled(&self) -> bool {
        true
    }
}

/// Shared demand bookkeeping: an accumulating, saturating counter plus
/// a cancellation flag. Most operator-level `SubscriptionImpl`s are a
/// thin wrapper around one of these plus a callback invoked whenever
/// demand increases from zero (so the operator knows when to (re)start
/// producing).
#[derive(Default)]
pub struct DemandCounter {
    requested: AtomicU64,
    cancelled: AtomicBool,
}

impl DemandCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to the outstanding demand, returning the value *before*
    /// the addition (so callers can detect a 0→positive transition).
    pub fn add(&self, n: u64) -> u64 {
        let before = self.requested.fetch_add(n, Ordering::AcqRel);
        // Saturate rather than silently wrapping past u64::MAX.
        if before.checked_add(n).is_none() {
            self.requested.store(u64::MAX, Ordering::Release);
        }
        before
    }

    /// Current outstanding demand.
    pub fn outstanding(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    /// Consume up to `n` units of demand, returning how much was
    /// actually available (`<= n`).
    pub fn take(&self, n: u64) -> u64 {
        loop {
            let current = self.requested.load(Ordering::Acquire);
            let grant = current.min(n);
            if grant == 0 {
                return 0;
            }
            let remaining = current - grant;
            if self
                .requested
                .compare_exchange(current, remaining, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return grant;
            }
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn demand_counter_accumulates() {
        let counter = DemandCounter::new();
        counter.add(3);
        counter.add(4);
        assert_eq!(counter.outstanding(), 7);
    }

    #[test]
    fn take_never_exceeds_available() {
        let counter = DemandCounter::new();
        counter.add(5);
        assert_eq!(counter.take(10), 5);
        assert_eq!(counter.outstanding(), 0);
        assert_eq!(counter.take(1), 0);
    }

    #[test]
    fn cancel_is_idempotent_and_terminal() {
        let counter = DemandCounter::new();
        counter.cancel();
        counter.cancel();
        assert!(counter.is_cancelled());
    }

    #[test]
    fn already_cancelled_subscription_ignores_request() {
        let sub = Subscription::already_cancelled();
        sub.request(10);
        assert!(sub.is_cancelled());
    }
}
