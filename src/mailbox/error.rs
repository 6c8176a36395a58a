//! Mailbox error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Failure modes for mailbox operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// The target actor's mailbox has already been closed (it has
    /// terminated); the envelope was discarded rather than delivered.
    #[error("mailbox closed")]
    Closed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn closed_error_displays() {
        assert_eq!(MailboxError::Closed.to_string(), "mailbox closed");
    }
}
