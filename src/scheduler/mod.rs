//! The scheduler core: two implementations of one contract — spawn,
//! queue an action, delay an action, start, stop (§4.4) — that drive
//! every [`crate::actor::ActorCell`]'s resume step.
//!
//! # Components
//!
//! - [`Scheduler`] — the trait both implementations satisfy
//! - [`Resumable`] — the bounded unit of work a scheduler drives;
//!   `ActorCell<A>` is the only production implementor
//! - [`PoolScheduler`] — a fixed-size, work-sharing thread pool
//! - [`TestScheduler`] — deterministic and single-threaded, grounded
//!   in CAF's `test_coordinator`
//! - [`clock`] — the steady-time abstraction `TestScheduler` and
//!   [`crate::flow::coordinator::Coordinator`] share
//!
//! Built around CAF's `mock_scheduler`/`test_coordinator` shape for
//! the deterministic variant, wrapped in the same `Arc<Inner>` plus
//! `parking_lot` locking idiom used elsewhere in this crate, with a
//! generic `Monitor<SchedulerEvent>` parameter that defaults to
//! zero-overhead.

pub mod clock;
pub mod pool;
pub mod test;
pub mod traits;

pub use clock::{Clock, LogicalClock, SystemClock, Tick};
pub use pool::{PoolScheduler, DEFAULT_RESUME_BUDGET};
pub use test::TestScheduler;
pub use traits::{Action, Resumable, Scheduler, SpawnOptions};
