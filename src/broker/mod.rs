//! The control plane: actor registration, name resolution, and the
//! link/monitor bookkeeping that backs exit propagation (§4.3/§4.9).
//!
//! Ordinary message routing does **not** live here — it happens
//! directly through a strongly-typed [`crate::actor::reference::ActorRef<M>`],
//! with no registry lookup on the hot path. This module is only the
//! type-erased control surface: [`registry::ActorControl`] lets the
//! registry deliver an `Exit`/`Down` envelope to an actor without
//! knowing its message type.
//!
//! # Components
//!
//! - [`ActorRegistry`] — lock-free (`DashMap`-backed) table of live
//!   actors, their names, and their link/monitor relationships
//! - [`BrokerError`] — failure modes for name lookups and requests

pub mod error;
pub mod registry;

pub use error::BrokerError;
pub use registry::{ActorControl, ActorRegistry};
