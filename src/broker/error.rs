//! Error types surfaced by the registry and request/response machinery.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::ActorAddress;

/// Failure modes for registry lookups and request/response tracking.
///
/// This is deliberately small: ordinary message delivery (`ActorRef::tell`)
/// cannot fail in a way callers can act on (§7 treats a send to a
/// terminated actor as a silent discard, not an error) — `BrokerError`
/// only covers the operations that have a meaningful failure case.
#[derive(Debug, Error, Clone)]
pub enum BrokerError {
    /// A name lookup found no actor registered under that name.
    #[error("actor not found: {0:?}")]
    ActorNotFound(ActorAddress),

    /// A `request` awaiting a reply did not receive one before its
    /// deadline elapsed (§7 `request_timeout`).
    #[error("request timed out after {timeout:?}")]
    RequestTimeout { timeout: Duration },

    /// Every branch of a `select_any` over multiple requests failed
    /// (§7 `all_requests_failed`).
    #[error("all requests failed")]
    AllRequestsFailed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn actor_not_found_displays_address() {
        let address = ActorAddress::named("printer");
        let error = BrokerError::ActorNotFound(address);
        assert!(error.to_string().contains("actor not found"));
    }

    #[test]
    fn request_timeout_displays_duration() {
        let error = BrokerError::RequestTimeout {
            timeout: Duration::from_secs(2),
        };
        assert!(error.to_string().contains("2s"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BrokerError>();
    }
}
