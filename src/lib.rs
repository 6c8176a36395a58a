//! # Fluxion — an in-process actor runtime with reactive-flow extensions
//!
//! Fluxion lets a program compose many small, independently-executing
//! actors that communicate only by asynchronous messages, and lets
//! those actors build asynchronous data pipelines ("flows") with
//! back-pressure on top of the same scheduler.
//!
//! # Quick Start
//!
//! ```rust
//! use fluxion::actor::{Actor, Behavior, ExitReason};
//! use fluxion::message::Message;
//! use fluxion::scheduler::{Scheduler, TestScheduler};
//! use std::fmt;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum CounterMessage {
//!     Increment,
//!     Quit,
//! }
//!
//! impl Message for CounterMessage {
//!     const MESSAGE_TYPE: &'static str = "counter";
//! }
//!
//! #[derive(Debug)]
//! struct CounterError;
//! impl fmt::Display for CounterError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "counter error")
//!     }
//! }
//! impl std::error::Error for CounterError {}
//!
//! struct CounterActor {
//!     count: u64,
//! }
//!
//! impl Actor for CounterActor {
//!     type Message = CounterMessage;
//!     type Error = CounterError;
//!
//!     fn initial_behavior() -> Behavior<Self> {
//!         Behavior::new().on(|actor: &mut CounterActor, msg, ctx| match msg {
//!             CounterMessage::Increment => {
//!                 actor.count += 1;
//!                 Some(Ok(()))
//!             }
//!             CounterMessage::Quit => {
//!                 ctx.quit(ExitReason::NORMAL);
//!                 Some(Ok(()))
//!             }
//!         })
//!     }
//! }
//!
//! let mut scheduler = TestScheduler::new();
//! let actor_ref = scheduler.spawn(CounterActor { count: 0 }, Default::default());
//! actor_ref.tell(CounterMessage::Increment);
//! actor_ref.tell(CounterMessage::Quit);
//! scheduler.run(10);
//! ```
//!
//! # Module organization
//!
//! - [`actor`] — actor identity, lifecycle, mailboxes (via
//!   [`mailbox`]), behavior stacks, request/response, linking and
//!   monitoring
//! - [`message`] — the `Message` marker trait and the envelope that
//!   travels through mailboxes
//! - [`mailbox`] — the dual-priority FIFO queue and suspension
//!   protocol each actor drains one resume step at a time
//! - [`broker`] — the process-wide actor registry backing name
//!   resolution, linking and monitoring
//! - [`scheduler`] — work-sharing thread pool and deterministic test
//!   scheduler that drive actor resume steps
//! - [`flow`] — the Observable/Observer/Subscription reactive engine:
//!   disposables, SPSC async buffers, coordinators, and the fixed
//!   operator catalog
//! - [`monitoring`] — a typed event bus for observing actor,
//!   mailbox, broker, scheduler and flow activity
//! - [`system`] — configuration ([`system::SystemConfig`]) and the
//!   process-wide runtime value ([`system::Runtime`])
//! - [`util`] — identifiers (`ActorId`, `MessageId`, `RequestId`,
//!   `ActorAddress`)
//!
//! # Non-goals
//!
//! No multi-host distribution, no preemptive actor scheduling, no
//! persistence of actor state across runs, no first-class typed
//! interface descriptions, no built-in hot code reload. Wire
//! serialization, network transport and CLI tooling are treated as
//! external collaborators and are out of scope for this crate.

pub mod actor;
pub mod broker;
pub mod flow;
pub mod mailbox;
pub mod message;
pub mod monitoring;
pub mod scheduler;
pub mod system;
pub mod util;

pub mod prelude;

// Re-export commonly used types.
pub use actor::{Actor, ActorContext, ActorRef, Behavior, ErrorAction, ExitReason};
pub use broker::ActorRegistry;
pub use mailbox::{Mailbox, MailboxSender};
pub use message::{Envelope, Message, Priority};
pub use monitoring::{Monitor, MonitoringEvent, NoopMonitor};
pub use scheduler::{PoolScheduler, Scheduler, SpawnOptions, TestScheduler};
pub use system::{Runtime, SystemConfig};
pub use util::{ActorAddress, ActorId, MessageId, RequestId};
