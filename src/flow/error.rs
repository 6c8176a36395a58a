//! The error taxonomy threaded through the flow engine's `on_error`
//! (§7).

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Failure modes an `Observer::on_error` may see, or that a
/// `Coordinator`-hosted action may propagate (§7).
#[derive(Debug, Error, Clone)]
pub enum FlowError {
    /// A generic failure in a user callback or operator (`map`'s `f`
    /// panicking is surfaced as this, not a Rust panic, once caught at
    /// the operator boundary).
    #[error("runtime error: {0}")]
    RuntimeError(String),

    /// Subscribing to a `from_resource`-backed observable whose
    /// resource is null or was already opened by another subscriber.
    #[error("invalid observable: {0}")]
    InvalidObservable(String),

    /// A second upstream was attached where only one is allowed (e.g.
    /// a connectable observable that has already connected once).
    #[error("cannot add upstream: {0}")]
    CannotAddUpstream(String),

    /// Every branch of a `select_any` over multiple pending requests
    /// failed.
    #[error("all requests failed")]
    AllRequestsFailed,

    /// Producer-side termination signal, distinguishable from an
    /// error — used internally by SPSC buffers and generators that
    /// need to say "no more items" without it being a fault.
    #[error("end of stream")]
    EndOfStream,

    /// A response (or, for flows, an upstream item) did not arrive
    /// before its deadline.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// A user callback panicked or returned an error that could not
    /// be attributed to a more specific kind.
    #[error("unhandled exception: {0}")]
    UnhandledException(String),

    /// The actor hosting a pending response terminated before
    /// answering it.
    #[error("broken promise")]
    BrokenPromise,

    /// A caller-chosen error kind, `code >= 0x1_0000` per §3/§7.
    #[error("user-defined error {code}: {payload}")]
    UserDefined { code: u32, payload: String },
}

impl FlowError {
    /// First code value reserved for caller-chosen errors, matching
    /// `ExitReason::USER_DEFINED_FLOOR`.
    pub const USER_DEFINED_FLOOR: u32 = 0x1_0000;

    /// Construct a user-defined flow error, clamping `code` up to the
    /// reserved floor the same way `ExitReason::user_defined` does.
    pub fn user_defined(code: u32, payload: impl Into<String>) -> Self {
        Self::UserDefined {
            code: code.max(Self::USER_DEFINED_FLOOR),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn user_defined_is_clamped_above_floor() {
        let err = FlowError::user_defined(3, "oops");
        match err {
            FlowError::UserDefined { code, .. } => assert!(code >= FlowError::USER_DEFINED_FLOOR),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlowError>();
    }

    #[test]
    fn display_messages_are_informative() {
        assert!(FlowError::AllRequestsFailed.to_string().contains("all requests failed"));
        assert!(FlowError::BrokenPromise.to_string().contains("broken promise"));
    }
}
