//! # Monitoring Module
//!
//! Universal monitoring infrastructure for observing and tracking events across all runtime components.
//!
//! ## Features
//! - **Generic Monitor<E> Trait**: Universal monitoring for any entity type
//! - **Zero-Cost Abstraction**: NoopMonitor compiles away when disabled
//! - **Lock-Free Recording**: Atomic counters for concurrent event tracking
//! - **Type Safety**: MonitoringEvent trait ensures compile-time correctness
//!
//! ## Event Types
//! - `SupervisionEvent`: Supervisor tree operations and failures
//! - `ActorEvent`: Actor lifecycle and message processing
//! - `SystemEvent`: Actor system-level events
//! - `BrokerEvent`: Message broker operations
//! - `MailboxEvent`: Mailbox operations and backpressure
//! - `SchedulerEvent`: Worker-pool resume steps and suspensions
//! - `FlowEvent`: Flow-operator subscribe/error/dispose events
//!
//! ## Examples
//! ```rust
//! use fluxion::monitoring::{InMemoryMonitor, Monitor, MonitoringConfig, ActorEvent, ActorEventKind};
//! use std::collections::HashMap;
//!
//! let config = MonitoringConfig::default();
//! let monitor = InMemoryMonitor::new(config);
//!
//! let event = ActorEvent {
//!     timestamp: chrono::Utc::now(),
//!     actor_id: fluxion::util::ActorId::next(),
//!     event_kind: ActorEventKind::Started,
//!     metadata: HashMap::new(),
//! };
//! monitor.record(event).unwrap();
//! let snapshot = monitor.snapshot().unwrap();
//! assert_eq!(snapshot.total_events, 1);
//! ```

pub mod error;
pub mod in_memory;
pub mod noop;
pub mod traits;
pub mod types;

pub use error::MonitoringError;
pub use in_memory::InMemoryMonitor;
pub use noop::NoopMonitor;
pub use traits::{EventSeverity, Monitor, MonitoringEvent};
pub use types::{
    ActorEvent, ActorEventKind, BrokerEvent, BrokerEventKind, FlowEvent, FlowEventKind,
    MailboxEvent, MailboxEventKind, MonitoringConfig, MonitoringSnapshot, SchedulerEvent,
    SchedulerEventKind, SupervisionEvent, SupervisionEventKind, SystemEvent, SystemEventKind,
};
