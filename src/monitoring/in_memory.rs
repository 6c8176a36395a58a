//! In-memory monitor implementation with lock-free atomic counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::error::MonitoringError;
use super::traits::{EventSeverity, Monitor, MonitoringEvent};
use super::types::{MonitoringConfig, MonitoringSnapshot};

/// In-memory monitor implementation with lock-free atomic counters.
///
/// This implementation provides efficient concurrent event recording using atomic
/// operations for counters and a bounded ring buffer for event history.
///
/// # Architecture
///
/// Uses an `Arc<Inner>` for cheap cloning:
/// - Atomic counters for lock-free event counting
/// - `parking_lot::RwLock` for the ring buffer (read-heavy optimization)
/// - Bounded memory with configurable history size
///
/// # Examples
///
/// ```
/// use fluxion::monitoring::{InMemoryMonitor, Monitor, MonitoringConfig, ActorEvent, ActorEventKind};
/// use chrono::Utc;
/// use std::collections::HashMap;
///
/// let config = MonitoringConfig::default();
/// let monitor = InMemoryMonitor::new(config);
///
/// let event = ActorEvent {
///     timestamp: Utc::now(),
///     actor_id: fluxion::util::ActorId::next(),
///     event_kind: ActorEventKind::Started,
///     metadata: HashMap::new(),
/// };
/// monitor.record(event).unwrap();
///
/// let snapshot = monitor.snapshot().unwrap();
/// assert_eq!(snapshot.total_events, 1);
/// ```
#[derive(Debug)]
pub struct InMemoryMonitor<E: MonitoringEvent> {
    inner: Arc<InMemoryMonitorInner<E>>,
}

/// Inner state for `InMemoryMonitor`, shared via `Arc` so clones are cheap.
#[derive(Debug)]
struct InMemoryMonitorInner<E: MonitoringEvent> {
    config: MonitoringConfig,

    // Lock-free atomic counters for concurrent access
    total_events: AtomicU64,
    trace_count: AtomicU64,
    debug_count: AtomicU64,
    info_count: AtomicU64,
    warning_count: AtomicU64,
    error_count: AtomicU64,
    critical_count: AtomicU64,

    // Ring buffer for event history (read-heavy optimization with RwLock)
    history: RwLock<VecDeque<E>>,
}

impl<E: MonitoringEvent> InMemoryMonitor<E> {
    /// Creates a new in-memory monitor with the given configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use fluxion::monitoring::{InMemoryMonitor, MonitoringConfig, ActorEvent};
    ///
    /// let config = MonitoringConfig::default();
    /// let monitor = InMemoryMonitor::<ActorEvent>::new(config);
    /// ```
    pub fn new(config: MonitoringConfig) -> Self {
        Self {
            inner: Arc::new(InMemoryMonitorInner {
                config,
                total_events: AtomicU64::new(0),
                trace_count: AtomicU64::new(0),
                debug_count: AtomicU64::new(0),
                info_count: AtomicU64::new(0),
                warning_count: AtomicU64::new(0),
                error_count: AtomicU64::new(0),
                critical_count: AtomicU64::new(0),
                history: RwLock::new(VecDeque::new()),
            }),
        }
    }

    /// Increments the appropriate severity counter atomically.
    fn increment_severity_counter(&self, severity: EventSeverity) {
        match severity {
            EventSeverity::Trace => self.inner.trace_count.fetch_add(1, Ordering::Relaxed),
            EventSeverity::Debug => self.inner.debug_count.fetch_add(1, Ordering::Relaxed),
            EventSeverity::Info => self.inner.info_count.fetch_add(1, Ordering::Relaxed),
            EventSeverity::Warning => self.inner.warning_count.fetch_add(1, Ordering::Relaxed),
            EventSeverity::Error => self.inner.error_count.fetch_add(1, Ordering::Relaxed),
            EventSeverity::Critical => self.inner.critical_count.fetch_add(1, Ordering::Relaxed),
        };
    }
}

impl<E: MonitoringEvent> Clone for InMemoryMonitor<E> {
    /// Cheap clone: shares the same `Arc<Inner>`.
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: MonitoringEvent> Monitor<E> for InMemoryMonitor<E> {
    fn record(&self, event: E) -> Result<(), MonitoringError> {
        if !self.inner.config.enabled {
            return Ok(());
        }

        let severity = event.severity();
        if severity < self.inner.config.severity_filter {
            return Ok(());
        }

        self.inner.total_events.fetch_add(1, Ordering::Relaxed);
        self.increment_severity_counter(severity);

        let mut history = self.inner.history.write();
        if history.len() >= self.inner.config.max_history_size {
            history.pop_front();
        }
        history.push_back(event);

        Ok(())
    }

    fn snapshot(&self) -> Result<MonitoringSnapshot<E>, MonitoringError> {
        let total_events = self.inner.total_events.load(Ordering::Relaxed);
        let trace_count = self.inner.trace_count.load(Ordering::Relaxed);
        let debug_count = self.inner.debug_count.load(Ordering::Relaxed);
        let info_count = self.inner.info_count.load(Ordering::Relaxed);
        let warning_count = self.inner.warning_count.load(Ordering::Relaxed);
        let error_count = self.inner.error_count.load(Ordering::Relaxed);
        let critical_count = self.inner.critical_count.load(Ordering::Relaxed);

        let history = self.inner.history.read();
        let recent_events = history.iter().cloned().collect();

        Ok(MonitoringSnapshot {
            timestamp: Utc::now(),
            total_events,
            trace_count,
            debug_count,
            info_count,
            warning_count,
            error_count,
            critical_count,
            recent_events,
        })
    }

    fn reset(&self) -> Result<(), MonitoringError> {
        self.inner.total_events.store(0, Ordering::Relaxed);
        self.inner.trace_count.store(0, Ordering::Relaxed);
        self.inner.debug_count.store(0, Ordering::Relaxed);
        self.inner.info_count.store(0, Ordering::Relaxed);
        self.inner.warning_count.store(0, Ordering::Relaxed);
        self.inner.error_count.store(0, Ordering::Relaxed);
        self.inner.critical_count.store(0, Ordering::Relaxed);

        self.inner.history.write().clear();

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::monitoring::types::{ActorEvent, ActorEventKind};
    use crate::util::ActorId;

    fn create_test_event(_severity: EventSeverity) -> ActorEvent {
        ActorEvent {
            timestamp: Utc::now(),
            actor_id: ActorId::next(),
            event_kind: ActorEventKind::Started,
            metadata: HashMap::new(),
        }
    }

    fn create_test_event_with_kind(kind: ActorEventKind) -> ActorEvent {
        ActorEvent {
            timestamp: Utc::now(),
            actor_id: ActorId::next(),
            event_kind: kind,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn monitor_creation() {
        let config = MonitoringConfig::default();
        let monitor = InMemoryMonitor::<ActorEvent>::new(config);
        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 0);
        assert_eq!(snapshot.recent_events.len(), 0);
    }

    #[test]
    fn record_single_event() {
        let config = MonitoringConfig::default();
        let monitor = InMemoryMonitor::new(config);
        let event = create_test_event(EventSeverity::Info);
        monitor.record(event).expect("record should succeed");
        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 1);
        assert_eq!(snapshot.info_count, 1);
        assert_eq!(snapshot.recent_events.len(), 1);
    }

    #[test]
    fn record_multiple_events() {
        let config = MonitoringConfig::default();
        let monitor = InMemoryMonitor::new(config);
        for _ in 0..10 {
            let event = create_test_event(EventSeverity::Info);
            monitor.record(event).expect("record should succeed");
        }
        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 10);
        assert_eq!(snapshot.info_count, 10);
        assert_eq!(snapshot.recent_events.len(), 10);
    }

    #[test]
    fn severity_filtering() {
        let config = MonitoringConfig {
            severity_filter: EventSeverity::Warning,
            ..MonitoringConfig::default()
        };
        let monitor = InMemoryMonitor::new(config);

        let info_event = create_test_event_with_kind(ActorEventKind::Started);
        monitor.record(info_event).expect("record should succeed");

        let error_event = create_test_event_with_kind(ActorEventKind::ErrorOccurred {
            error: "test error".to_string(),
        });
        monitor.record(error_event).expect("record should succeed");

        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 1);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.info_count, 0);
    }

    #[test]
    fn ring_buffer_overflow() {
        let config = MonitoringConfig {
            max_history_size: 5,
            ..MonitoringConfig::default()
        };
        let monitor = InMemoryMonitor::new(config);
        for _ in 0..10 {
            let event = create_test_event(EventSeverity::Info);
            monitor.record(event).expect("record should succeed");
        }
        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 10);
        assert_eq!(snapshot.recent_events.len(), 5);
    }

    #[test]
    fn reset_functionality() {
        let config = MonitoringConfig::default();
        let monitor = InMemoryMonitor::new(config);
        for _ in 0..5 {
            let event = create_test_event(EventSeverity::Info);
            monitor.record(event).expect("record should succeed");
        }
        monitor.reset().expect("reset should succeed");
        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 0);
        assert_eq!(snapshot.info_count, 0);
        assert_eq!(snapshot.recent_events.len(), 0);
    }

    #[test]
    fn clone_implementation() {
        let config = MonitoringConfig::default();
        let monitor1 = InMemoryMonitor::new(config);
        let event = create_test_event(EventSeverity::Info);
        monitor1.record(event).expect("record should succeed");
        let monitor2 = monitor1.clone();
        let snapshot1 = monitor1.snapshot().expect("snapshot should succeed");
        let snapshot2 = monitor2.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot1.total_events, snapshot2.total_events);
        assert_eq!(snapshot1.info_count, snapshot2.info_count);
    }

    #[test]
    fn disabled_monitoring() {
        let config = MonitoringConfig {
            enabled: false,
            ..MonitoringConfig::default()
        };
        let monitor = InMemoryMonitor::new(config);
        let event = create_test_event(EventSeverity::Info);
        monitor.record(event).expect("record should succeed");
        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 0);
    }

    #[test]
    fn severity_counters() {
        let config = MonitoringConfig {
            severity_filter: EventSeverity::Trace,
            ..MonitoringConfig::default()
        };
        let monitor = InMemoryMonitor::new(config);

        let events = vec![
            create_test_event_with_kind(ActorEventKind::Spawned),
            create_test_event_with_kind(ActorEventKind::Started),
            create_test_event_with_kind(ActorEventKind::ErrorOccurred {
                error: "test".to_string(),
            }),
        ];
        for event in events {
            monitor.record(event).expect("record should succeed");
        }

        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.debug_count, 1);
        assert_eq!(snapshot.info_count, 1);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn concurrent_recording() {
        let config = MonitoringConfig::default();
        let monitor = InMemoryMonitor::new(config);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let monitor_clone = monitor.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..10 {
                    let event = create_test_event(EventSeverity::Info);
                    monitor_clone.record(event).expect("record should succeed");
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread should complete");
        }

        let snapshot = monitor.snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.total_events, 100);
        assert_eq!(snapshot.info_count, 100);
    }
}
