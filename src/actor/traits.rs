//! The `Actor` trait every user-defined actor implements.

// Layer 1: Standard library imports
use std::error::Error;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::behavior::Behavior;
use super::context::ActorContext;
use crate::message::Message;

/// A computation unit that owns its state, processes one message at a
/// time from its mailbox, and communicates only by exchanging
/// messages through an [`ActorContext`].
///
/// # Example
///
/// ```rust
/// use fluxion::actor::{Actor, Behavior};
/// use fluxion::message::Message;
/// use std::fmt;
///
/// #[derive(Debug, Clone)]
/// enum Counter { Increment, Reset }
///
/// impl Message for Counter {
///     const MESSAGE_TYPE: &'static str = "counter";
/// }
///
/// #[derive(Debug)]
/// struct CounterError;
/// impl fmt::Display for CounterError {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "counter error") }
/// }
/// impl std::error::Error for CounterError {}
///
/// struct CounterActor { value: i64 }
///
/// impl Actor for CounterActor {
///     type Message = Counter;
///     type Error = CounterError;
///
///     fn initial_behavior() -> Behavior<Self> {
///         Behavior::new().on(|actor: &mut CounterActor, msg, _ctx| match msg {
///             Counter::Increment => { actor.value += 1; Some(Ok(())) }
///             Counter::Reset => { actor.value = 0; Some(Ok(())) }
///         })
///     }
/// }
/// ```
pub trait Actor: Send + 'static {
    /// The set of messages this actor understands.
    type Message: Message;

    /// The error type a behavior clause may return.
    type Error: Error + Send + Sync + 'static;

    /// Build the behavior this actor starts in. Called once, when the
    /// actor is spawned.
    fn initial_behavior() -> Behavior<Self>
    where
        Self: Sized;

    /// Called once, before the first message is dispatched. The
    /// default does nothing.
    fn pre_start(&mut self, _ctx: &mut ActorContext<Self>) -> Result<(), Self::Error>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// Called once, after the actor has fully stopped (its mailbox is
    /// closed and every attachable has fired). The default does
    /// nothing; `reason` is why it stopped.
    fn post_stop(&mut self, _reason: &super::exit::ExitReason) {}

    /// Called when a behavior clause returns `Err`. The returned
    /// [`ErrorAction`] tells the cell how to proceed. The default
    /// stops the actor with `ExitReason::UNHANDLED_EXCEPTION`.
    fn on_error(&mut self, _error: Self::Error, _ctx: &mut ActorContext<Self>) -> ErrorAction
    where
        Self: Sized,
    {
        ErrorAction::Stop
    }

    /// Called when a linked peer exits and `trap_exit` is enabled
    /// (§4.3). Without trapping, a non-normal exit instead terminates
    /// this actor directly and `on_exit` is never reached. The default
    /// does nothing.
    fn on_exit(
        &mut self,
        _from: crate::util::ids::ActorId,
        _reason: &super::exit::ExitReason,
        _ctx: &mut ActorContext<Self>,
    ) where
        Self: Sized,
    {
    }

    /// Called when a monitored actor terminates (§4.3). The default
    /// does nothing.
    fn on_down(
        &mut self,
        _who: crate::util::ids::ActorId,
        _reason: &super::exit::ExitReason,
        _ctx: &mut ActorContext<Self>,
    ) where
        Self: Sized,
    {
    }

    /// Called when the current behavior frame's timeout elapses with
    /// no message dequeued (§4.2). The default does nothing.
    fn on_timeout(&mut self, _ctx: &mut ActorContext<Self>)
    where
        Self: Sized,
    {
    }

    /// Called when a `request` this actor issued exceeded its deadline
    /// without a matching response arriving (§7). The default does
    /// nothing.
    fn on_request_timeout(
        &mut self,
        _request_id: crate::util::ids::RequestId,
        _ctx: &mut ActorContext<Self>,
    ) where
        Self: Sized,
    {
    }

    /// Called once per still-outstanding `request` when this actor
    /// terminates before a matching response arrived (§4.3 shutdown
    /// order step 3, §7 `broken_promise`). Not called for requests
    /// that already timed out or were answered — `drain_all_pending`
    /// only returns what is still pending at the moment of
    /// termination. The default does nothing.
    fn on_broken_promise(
        &mut self,
        _request_id: crate::util::ids::RequestId,
        _ctx: &mut ActorContext<Self>,
    ) where
        Self: Sized,
    {
    }
}

/// What an `ActorCell` does after a behavior clause errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Terminate with `ExitReason::UNHANDLED_EXCEPTION`.
    Stop,
    /// Discard the error and keep processing the next message.
    Resume,
    /// Re-run `pre_start` and continue with the same behavior stack.
    Restart,
}

impl Default for ErrorAction {
    fn default() -> Self {
        Self::Stop
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::behavior::Behavior;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Ping,
    }

    impl Message for Ping {
        const MESSAGE_TYPE: &'static str = "ping";
    }

    #[derive(Debug)]
    struct PingError;

    impl fmt::Display for PingError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ping error")
        }
    }
    impl Error for PingError {}

    struct PingActor {
        count: u32,
    }

    impl Actor for PingActor {
        type Message = Ping;
        type Error = PingError;

        fn initial_behavior() -> Behavior<Self> {
            Behavior::new().on(|actor: &mut PingActor, _msg, _ctx| {
                actor.count += 1;
                Some(Ok(()))
            })
        }

        fn pre_start(&mut self, _ctx: &mut ActorContext<Self>) -> Result<(), Self::Error> {
            self.count = 0;
            Ok(())
        }
    }

    #[test]
    fn pre_start_resets_state() {
        let mut actor = PingActor { count: 7 };
        let mut ctx = ActorContext::for_test();
        actor.pre_start(&mut ctx).unwrap();
        assert_eq!(actor.count, 0);
    }

    #[test]
    fn default_on_error_stops() {
        let mut actor = PingActor { count: 0 };
        let mut ctx = ActorContext::for_test();
        let action = actor.on_error(PingError, &mut ctx);
        assert_eq!(action, ErrorAction::Stop);
    }

    #[test]
    fn error_action_default_is_stop() {
        assert_eq!(ErrorAction::default(), ErrorAction::Stop);
    }
}
