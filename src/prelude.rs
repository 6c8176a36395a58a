//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits for
//! building actors and flows with fluxion. Import this module to get
//! started quickly:
//!
//! ```rust
//! use fluxion::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Core Actor System
//! - [`Actor`] — the trait every user-defined actor implements
//! - [`ActorContext`] — send/request/link/monitor/become/quit surface
//! - [`ActorCell`]/[`ResumeOutcome`]/[`SpawnedActor`] — the resume-step driver
//! - [`ActorRef`]/[`ReplyTo`] — typed handles to another actor's mailbox
//! - [`Behavior`]/[`BehaviorStack`]/[`BecomePolicy`] — the become/unbecome state machine
//! - [`ExitReason`] — why an actor stopped
//! - [`ErrorAction`] — what a cell does after a behavior clause errors
//! - [`ActorState`]/[`ActorLifecycle`] — the five-state cooperative lifecycle
//!
//! ## Messaging
//! - [`Message`] — the marker trait every message payload implements
//! - [`Envelope`]/[`EnvelopeBody`] — the mailbox-internal wrapper with sender/response metadata
//! - [`Priority`] — normal vs. high-priority delivery
//!
//! ## Mailbox
//! - [`Mailbox`]/[`MailboxSender`] — the dual-priority FIFO queue and its sending half
//! - [`MailboxError`] — the single failure mode (send to a closed mailbox)
//!
//! ## Actor registry
//! - [`ActorRegistry`] — the process-wide directory backing link/monitor/name resolution
//! - [`BrokerError`] — name lookup and control-plane failure modes
//!
//! ## Scheduler
//! - [`Scheduler`] — spawn/resume/schedule_action/delay_action/start/stop
//! - [`PoolScheduler`] — the work-sharing worker-thread pool
//! - [`TestScheduler`] — the deterministic, single-threaded scheduler
//! - [`SpawnOptions`] — monitored/linked/detached/blocking_api/priority_aware
//!
//! ## Reactive flow
//! - [`Observable`]/[`Observer`]/[`Subscription`] — the three-party flow protocol
//! - [`Coordinator`] — the per-actor flow execution context
//! - [`Disposable`] — a handle that can be cancelled exactly once
//! - [`FlowError`] — the error taxonomy threaded through `on_error`
//!
//! ## Monitoring
//! - [`Monitor`] — the generic event-recording trait
//! - [`InMemoryMonitor`] — an in-process snapshot-producing monitor
//! - [`NoopMonitor`] — zero-overhead default
//! - [`MonitoringEvent`] — marker trait for recordable events
//!
//! ## System
//! - [`SystemConfig`] — actor-system-wide configuration
//!
//! ## Utilities
//! - [`ActorAddress`]/[`ActorId`]/[`MessageId`]/[`RequestId`] — identifiers
//!
//! # Example
//!
//! ```rust
//! use fluxion::prelude::*;
//! use std::fmt;
//!
//! #[derive(Debug, Clone)]
//! struct MyMessage {
//!     data: String,
//! }
//!
//! impl Message for MyMessage {
//!     const MESSAGE_TYPE: &'static str = "my_message";
//! }
//!
//! #[derive(Debug)]
//! struct MyError;
//! impl fmt::Display for MyError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "my error")
//!     }
//! }
//! impl std::error::Error for MyError {}
//!
//! struct MyActor {
//!     count: u64,
//! }
//!
//! impl Actor for MyActor {
//!     type Message = MyMessage;
//!     type Error = MyError;
//!
//!     fn initial_behavior() -> Behavior<Self> {
//!         Behavior::new().on(|actor: &mut MyActor, _msg, _ctx| {
//!             actor.count += 1;
//!             Some(Ok(()))
//!         })
//!     }
//! }
//! ```

// Core actor system
pub use crate::actor::{
    Actor, ActorCell, ActorContext, ActorLifecycle, ActorRef, ActorState, Behavior, BecomePolicy,
    BehaviorStack, ErrorAction, ExitReason, ReplyTo, ResumeOutcome, SpawnedActor,
};

// Blocking receive surface (§6's `blocking_api` capability)
pub use crate::actor::{spawn_blocking_actor, BlockingActor, BlockingActorContext, Handlers, ResponseOutcome};

// Messaging
pub use crate::message::{Envelope, EnvelopeBody, Message, Priority};

// Mailbox
pub use crate::mailbox::{Mailbox, MailboxError, MailboxSender};

// Actor registry
pub use crate::broker::{ActorRegistry, BrokerError};

// Scheduler
pub use crate::scheduler::{PoolScheduler, Scheduler, SpawnOptions, TestScheduler};

// Reactive flow
pub use crate::flow::{Coordinator, Disposable, FlowError, Observable, Observer, Subscription};

// Monitoring
pub use crate::monitoring::{InMemoryMonitor, Monitor, MonitoringEvent, NoopMonitor};

// System
pub use crate::system::{Runtime, SystemConfig};

// Utilities
pub use crate::util::{ActorAddress, ActorId, MessageId, RequestId};
