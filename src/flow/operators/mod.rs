//! The operator catalog (§4.8): every operator is a plain function from
//! one or more `BoxObservable`s to a new `BoxObservable`, built by
//! wrapping the downstream `Observer` rather than introducing a fresh
//! scheduling primitive per operator. `sources` is the exception —
//! those construct a [`super::observable::PullSource`] from scratch and
//! ride the shared `subscribe_pull` driver.

pub mod batch;
pub mod combine;
pub mod interval;
pub mod multicast;
pub mod observe_on;
pub mod select_any;
pub mod sources;
pub mod tap;
pub mod transform;

pub use batch::{buffer, buffer_timed, head_and_tail, prefix_and_tail};
pub use combine::{concat, merge, merge_with_options, zip_with, MergeOptions};
pub use interval::{interval, timer};
pub use multicast::{auto_connect, publish, share, ConnectableObservable};
pub use observe_on::observe_on;
pub use select_any::select_any;
pub use sources::{defer, empty, fail, from_callable, from_container, from_generator, from_resource, iota, just, never, range, repeat};
pub use tap::{do_finally, do_on_complete, do_on_error, on_error_complete};
pub use transform::{concat_map, distinct, filter, flat_map, flat_map_optional, map, skip, sum, take, take_while};
