//! `Runtime`: the process-wide value a program actually constructs
//! (§9's "global mutable state" redesign note).
//!
//! One `Arc`-shared handle owning a [`PoolScheduler`] and its
//! [`ActorRegistry`]: `start()` builds the pool and starts its
//! workers, `spawn()` forwards to the pool, and `shutdown()` joins
//! them. There is deliberately no hidden global/`static` instance — a
//! process that wants exactly one `Runtime` gets that by holding
//! exactly one value, not by reaching for a singleton.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::config::SystemConfig;
use crate::actor::{Actor, ActorRef};
use crate::broker::ActorRegistry;
use crate::monitoring::{Monitor, NoopMonitor, SchedulerEvent};
use crate::scheduler::{PoolScheduler, Scheduler, SpawnOptions};

/// Owns one [`PoolScheduler`] (and the [`ActorRegistry`] it was built
/// with) for the lifetime of the process, or however long the caller
/// keeps it alive. Generic over the monitor so a production deployment
/// can plug in [`crate::monitoring::InMemoryMonitor`] (or any other
/// [`Monitor<SchedulerEvent>`]) without the default [`NoopMonitor`]
/// path paying for it.
pub struct Runtime<Mon: Monitor<SchedulerEvent> = NoopMonitor<SchedulerEvent>> {
    config: SystemConfig,
    scheduler: PoolScheduler<Mon>,
}

impl Runtime<NoopMonitor<SchedulerEvent>> {
    /// Build a pool sized from `config.scheduler` against a fresh
    /// registry, with no monitoring, and start its workers.
    pub fn start(config: SystemConfig) -> Self {
        let scheduler = PoolScheduler::new(&config.scheduler);
        scheduler.start();
        Self { config, scheduler }
    }
}

impl<Mon: Monitor<SchedulerEvent> + 'static> Runtime<Mon> {
    /// Build against an explicit registry and monitor (for tests that
    /// want to inspect [`crate::monitoring::InMemoryMonitor`]'s
    /// snapshot, or that need to share a registry across more than one
    /// runtime), and start its workers.
    pub fn start_with(config: SystemConfig, registry: ActorRegistry, monitor: Mon) -> Self {
        let scheduler = PoolScheduler::with_monitor(&config.scheduler, registry, monitor);
        scheduler.start();
        Self { config, scheduler }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// The directory backing every actor this runtime has spawned —
    /// the same one `link`/`monitor`/name resolution consult.
    pub fn registry(&self) -> &ActorRegistry {
        self.scheduler.registry()
    }

    /// Spawn `actor` onto this runtime's pool (§6's Spawn API).
    pub fn spawn<A: Actor>(&self, actor: A, options: SpawnOptions) -> ActorRef<A::Message> {
        self.scheduler.spawn(actor, options)
    }

    /// Stop accepting new work and join every worker and timer thread.
    /// Consumes `self`: a stopped runtime has nothing left to offer.
    pub fn shutdown(self) {
        self.scheduler.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::{Behavior, ExitReason};
    use crate::message::Message;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Greet,
        Quit,
    }

    impl Message for Msg {
        const MESSAGE_TYPE: &'static str = "runtime_greeting";
    }

    #[derive(Debug)]
    struct NoError;
    impl std::fmt::Display for NoError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "no error")
        }
    }
    impl std::error::Error for NoError {}

    struct Greeter {
        replies: mpsc::Sender<&'static str>,
    }

    impl Actor for Greeter {
        type Message = Msg;
        type Error = NoError;

        fn initial_behavior() -> Behavior<Self> {
            Behavior::new().on(|actor: &mut Greeter, msg, ctx| match msg {
                Msg::Greet => {
                    let _ = actor.replies.send("hello");
                    Some(Ok(()))
                }
                Msg::Quit => {
                    ctx.quit(ExitReason::NORMAL);
                    Some(Ok(()))
                }
            })
        }
    }

    #[test]
    fn spawns_and_shuts_down_cleanly() {
        let runtime = Runtime::start(SystemConfig::default());
        let (tx, rx) = mpsc::channel();
        let actor_ref = runtime.spawn(Greeter { replies: tx }, SpawnOptions::new());
        actor_ref.tell(Msg::Greet);
        actor_ref.tell(Msg::Quit);

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok("hello"));
        runtime.shutdown();
    }

    #[test]
    fn registry_resolves_named_actors() {
        let runtime = Runtime::start(SystemConfig::default());
        let (tx, _rx) = mpsc::channel();
        let actor_ref = runtime.spawn(Greeter { replies: tx }, SpawnOptions::named("greeter"));
        assert_eq!(runtime.registry().resolve_name("greeter"), Some(actor_ref.id()));
        runtime.shutdown();
    }
}
