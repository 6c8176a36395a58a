//! Actor system core: the per-actor execution primitives the
//! scheduler drives one resume step at a time.
//!
//! # Components
//!
//! - [`Actor`] — the trait every user-defined actor implements
//! - [`ActorContext`] — per-actor metadata, messaging, linking and
//!   behavior-stack mutation surface
//! - [`Behavior`]/[`BehaviorStack`] — the become/unbecome state
//!   machine (§4.2)
//! - [`ActorCell`] — pairs a mailbox, behavior stack, and actor
//!   instance into a single resumable unit (§4.1, §5)
//! - [`ActorState`]/[`SharedActorState`] — the five-state cooperative
//!   lifecycle (`ready`/`running`/`about_to_block`/`blocked`/`done`)
//!   and its double-check suspension protocol
//! - [`ExitReason`] — why an actor stopped
//! - [`ActorRef`] — a strongly-typed handle other actors send through
//!
//! # Actor Model Basics
//!
//! Actors are independent units of computation that:
//! - Maintain isolated state (no shared memory)
//! - Communicate via message passing through their mailbox
//! - Process messages one at a time, cooperatively yielding to the
//!   scheduler between resume steps rather than blocking a thread
//! - Follow a defined lifecycle (`pre_start` → dispatch loop → `post_stop`)
//!
//! # Quick Start Example
//!
//! ```rust
//! use fluxion::actor::{Actor, Behavior};
//! use fluxion::message::Message;
//!
//! #[derive(Debug, Clone)]
//! enum CounterMessage {
//!     Increment,
//! }
//!
//! impl Message for CounterMessage {
//!     const MESSAGE_TYPE: &'static str = "counter";
//! }
//!
//! struct CounterActor {
//!     count: u64,
//! }
//!
//! impl Actor for CounterActor {
//!     type Message = CounterMessage;
//!     type Error = std::convert::Infallible;
//!
//!     fn initial_behavior() -> Behavior<Self> {
//!         Behavior::new().on(|actor: &mut CounterActor, msg, _ctx| match msg {
//!             CounterMessage::Increment => {
//!                 actor.count += 1;
//!                 Some(Ok(()))
//!             }
//!         })
//!     }
//! }
//! ```
//!
//! # See Also
//!
//! - [`message`](crate::message) — the message and envelope model
//! - [`broker`](crate::broker) — the registry backing link/monitor and name resolution
//! - [`scheduler`](crate::scheduler) — the driver that calls `ActorCell::resume`

pub mod attachable;
pub mod behavior;
pub mod blocking;
pub mod cell;
pub mod context;
pub mod exit;
pub mod reference;
pub mod state;
pub mod traits;

pub use attachable::{Attachable, AttachableSet};
pub use behavior::{Behavior, BecomePolicy, BehaviorStack, Transition};
pub use blocking::{spawn_blocking_actor, BlockingActor, BlockingActorContext, Handlers, ResponseOutcome};
pub use cell::{ActorCell, ResumeOutcome, SpawnedActor};
pub use context::ActorContext;
pub use exit::ExitReason;
pub use reference::{ActorRef, ReplyTo};
pub use state::{ActorLifecycle, ActorState, SharedActorState};
pub use traits::{Actor, ErrorAction};
