//! The reactive-flow engine: an Observable/Observer/Subscription protocol
//! with request-N back-pressure (§4.7), a fixed operator catalog
//! (§4.8), an SPSC async buffer for crossing actor boundaries (§4.6),
//! a single-threaded `Coordinator` execution context (§4.5), and
//! `Disposable` handles tying all of it together.
//!
//! # Components
//!
//! - [`Observable`]/[`Observer`]/[`Subscription`] — the core protocol
//! - [`Coordinator`] — the execution context a flow runs on
//! - [`Disposable`] — cancelable-resource handle shared across the protocol
//! - [`AsyncProducer`]/[`AsyncConsumer`] — the SPSC buffer bridging two coordinators
//! - [`operators`] — the fixed catalog built on top of the protocol
//! - [`FlowError`] — the error taxonomy threaded through `on_error`

pub mod buffer;
pub mod coordinator;
pub mod disposable;
pub mod error;
pub mod observable;
pub mod operators;
pub mod subscription;

pub use buffer::{
    channel, make_spsc_buffer_resource, AsyncConsumer, AsyncProducer, ConsumerResource, ProducerResource, PullOutcome,
    PullPolicy,
};
pub use coordinator::{Action, Coordinator};
pub use disposable::{make_composite, make_flag, CountedDisposable, Disposable, DisposableSource};
pub use error::FlowError;
pub use observable::{subscribe_pull, BoxObservable, BoxObserver, Observable, Observer, PullSource};
pub use subscription::{DemandCounter, Subscription, SubscriptionImpl};
