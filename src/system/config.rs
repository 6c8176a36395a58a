//! System configuration with sensible defaults.

// Layer 1: Standard library
use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
// (none initially)

/// Default mailbox capacity for bounded mailboxes
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;

/// Default timeout for actor spawn operations (5 seconds)
pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for graceful system shutdown (30 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum concurrent actors (0 = unlimited)
pub const DEFAULT_MAX_ACTORS: usize = 0;

/// Default metrics collection setting (disabled following YAGNI §6.1)
pub const DEFAULT_ENABLE_METRICS: bool = false;

/// Default worker-pool size: `0` means "use the host's core count,
/// lower-bounded at 1" (§4.4).
pub const DEFAULT_SCHEDULER_MAX_THREADS: usize = 0;

/// Default SPSC / flow buffer capacity (`flow.buffer_size`).
pub const DEFAULT_FLOW_BUFFER_SIZE: usize = 256;

/// Default minimum-request-size a consumer uses to throttle wake-ups
/// (`flow.min_demand`).
pub const DEFAULT_FLOW_MIN_DEMAND: usize = 16;

/// Default batch size for `buffer(n)`-style operators without an
/// explicit `n` (`flow.batch_size`).
pub const DEFAULT_FLOW_BATCH_SIZE: usize = 64;

/// The scheduler's fairness policy. §4.4 requires work-sharing (not
/// work-stealing); `WorkSharing` is presently the only variant, kept
/// as an enum so a future policy is a non-breaking addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerPolicy {
    /// Ready actors sit in one shared queue; any idle worker may pick
    /// up any ready actor.
    WorkSharing,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self::WorkSharing
    }
}

/// Scheduler-related configuration (`scheduler.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Worker-pool size. `0` means "use the host's core count,
    /// lower-bounded at 1" — resolved by [`SchedulerConfig::resolved_max_threads`].
    pub max_threads: usize,

    /// Scheduling policy; `WorkSharing` per §4.4.
    pub policy: SchedulerPolicy,
}

impl SchedulerConfig {
    /// The worker-pool size to actually use: `max_threads` if
    /// non-zero, otherwise the host's core count (lower-bounded at 1).
    pub fn resolved_max_threads(&self) -> usize {
        if self.max_threads > 0 {
            return self.max_threads;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_SCHEDULER_MAX_THREADS,
            policy: SchedulerPolicy::default(),
        }
    }
}

/// Flow-engine configuration (`flow.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Default SPSC buffer capacity for `observe_on` and
    /// `from_resource`-backed observables.
    pub buffer_size: usize,

    /// Default `min_request_size` for SPSC buffers — how many
    /// buffered items accumulate before the consumer is woken.
    pub min_demand: usize,

    /// Default batch size for unparameterized `buffer(..)` uses.
    pub batch_size: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_FLOW_BUFFER_SIZE,
            min_demand: DEFAULT_FLOW_MIN_DEMAND,
            batch_size: DEFAULT_FLOW_BATCH_SIZE,
        }
    }
}

/// System-wide configuration for actor runtime.
///
/// Provides sensible defaults following §6.1 YAGNI principles.
///
/// # Examples
///
/// ```rust
/// use fluxion::system::{SystemConfig, DEFAULT_MAILBOX_CAPACITY};
/// use std::time::Duration;
///
/// // Use default configuration
/// let config = SystemConfig::default();
/// assert_eq!(config.default_mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
///
/// // Use builder for custom configuration
/// let config = SystemConfig::builder()
///     .with_mailbox_capacity(500)
///     .with_spawn_timeout(Duration::from_secs(10))
///     .with_scheduler_max_threads(4)
///     .with_flow_buffer_size(512)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_mailbox_capacity, 500);
/// assert_eq!(config.scheduler.max_threads, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Default mailbox capacity for bounded mailboxes
    pub default_mailbox_capacity: usize,

    /// Timeout for actor spawn operations
    pub spawn_timeout: Duration,

    /// Timeout for graceful system shutdown
    pub shutdown_timeout: Duration,

    /// Maximum concurrent actors (0 = unlimited)
    pub max_actors: usize,

    /// Enable system metrics collection (disabled by default - YAGNI)
    pub enable_metrics: bool,

    /// `scheduler.*` options.
    pub scheduler: SchedulerConfig,

    /// `flow.*` options.
    pub flow: FlowConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            default_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_actors: DEFAULT_MAX_ACTORS,
            enable_metrics: DEFAULT_ENABLE_METRICS,
            scheduler: SchedulerConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Create a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fluxion::system::SystemConfig;
    ///
    /// let config = SystemConfig::builder()
    ///     .with_mailbox_capacity(500)
    ///     .with_max_actors(100)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> SystemConfigBuilder {
        SystemConfigBuilder::default()
    }

    /// Validate configuration values.
    ///
    /// Returns `Err` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_mailbox_capacity == 0 {
            return Err("default_mailbox_capacity must be > 0".to_string());
        }

        if self.spawn_timeout.as_secs() == 0 && self.spawn_timeout.as_millis() == 0 {
            return Err("spawn_timeout must be > 0".to_string());
        }

        if self.shutdown_timeout.as_secs() == 0 && self.shutdown_timeout.as_millis() == 0 {
            return Err("shutdown_timeout must be > 0".to_string());
        }

        if self.flow.buffer_size == 0 {
            return Err("flow.buffer_size must be > 0".to_string());
        }

        if self.flow.batch_size == 0 {
            return Err("flow.batch_size must be > 0".to_string());
        }

        Ok(())
    }

    /// Layer configuration from `FLUXION_*` environment variables over
    /// the struct defaults — unset or unparsable variables fall back
    /// to the default rather than erroring.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_usize("FLUXION_MAILBOX_CAPACITY") {
            config.default_mailbox_capacity = v;
        }
        if let Some(v) = env_usize("FLUXION_MAX_ACTORS") {
            config.max_actors = v;
        }
        if let Some(v) = env_bool("FLUXION_ENABLE_METRICS") {
            config.enable_metrics = v;
        }
        if let Some(v) = env_usize("FLUXION_SCHEDULER_MAX_THREADS") {
            config.scheduler.max_threads = v;
        }
        if let Some(v) = env_usize("FLUXION_FLOW_BUFFER_SIZE") {
            config.flow.buffer_size = v;
        }
        if let Some(v) = env_usize("FLUXION_FLOW_MIN_DEMAND") {
            config.flow.min_demand = v;
        }
        if let Some(v) = env_usize("FLUXION_FLOW_BATCH_SIZE") {
            config.flow.batch_size = v;
        }
        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Builder for SystemConfig with fluent API.
///
/// Follows Builder Pattern for ergonomic configuration.
#[derive(Debug, Default)]
pub struct SystemConfigBuilder {
    config: SystemConfig,
}

impl SystemConfigBuilder {
    /// Set default mailbox capacity for bounded mailboxes.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.default_mailbox_capacity = capacity;
        self
    }

    /// Set timeout for actor spawn operations.
    pub fn with_spawn_timeout(mut self, timeout: Duration) -> Self {
        self.config.spawn_timeout = timeout;
        self
    }

    /// Set timeout for graceful system shutdown.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Set maximum number of concurrent actors (0 = unlimited).
    pub fn with_max_actors(mut self, max: usize) -> Self {
        self.config.max_actors = max;
        self
    }

    /// Enable or disable system metrics collection.
    ///
    /// Disabled by default following YAGNI principle.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.config.enable_metrics = enabled;
        self
    }

    /// Set the worker-pool size (`scheduler.max_threads`).
    pub fn with_scheduler_max_threads(mut self, max_threads: usize) -> Self {
        self.config.scheduler.max_threads = max_threads;
        self
    }

    /// Set the scheduling policy (`scheduler.policy`).
    pub fn with_scheduler_policy(mut self, policy: SchedulerPolicy) -> Self {
        self.config.scheduler.policy = policy;
        self
    }

    /// Set the default flow SPSC buffer capacity (`flow.buffer_size`).
    pub fn with_flow_buffer_size(mut self, size: usize) -> Self {
        self.config.flow.buffer_size = size;
        self
    }

    /// Set the default flow minimum-request size (`flow.min_demand`).
    pub fn with_flow_min_demand(mut self, min_demand: usize) -> Self {
        self.config.flow.min_demand = min_demand;
        self
    }

    /// Set the default `buffer(..)` batch size (`flow.batch_size`).
    pub fn with_flow_batch_size(mut self, batch_size: usize) -> Self {
        self.config.flow.batch_size = batch_size;
        self
    }

    /// Build and validate the configuration.
    ///
    /// Returns `Err` if configuration is invalid.
    pub fn build(self) -> Result<SystemConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
