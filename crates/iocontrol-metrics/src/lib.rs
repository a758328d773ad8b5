//! Per-backend, per-operation performance counters.
//!
//! Mirrors `original_source/src/iocontrol/core/metrics.py`: a rolling
//! window of the last 100 sample durations per operation, running
//! count/min/max/error totals, and a stale-backend eviction sweep run
//! inline on the recording path rather than as a separate timer task.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const RECENT_WINDOW: usize = 100;
const STALE_TIMEOUT: Duration = Duration::from_secs(3600);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Which operation a sample belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    Read,
    Write,
}

/// Running statistics for one (backend, operation) pair.
#[derive(Debug, Clone, Default)]
pub struct OperationMetrics {
    pub count: u64,
    pub total: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
    pub error_count: u64,
    recent: VecDeque<Duration>,
}

impl OperationMetrics {
    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }

    pub fn recent_avg(&self) -> Duration {
        if self.recent.is_empty() {
            Duration::ZERO
        } else {
            self.recent.iter().sum::<Duration>() / self.recent.len() as u32
        }
    }

    fn update(&mut self, duration: Duration, error: bool) {
        self.count += 1;
        self.total += duration;
        self.min = Some(self.min.map_or(duration, |m| m.min(duration)));
        self.max = Some(self.max.map_or(duration, |m| m.max(duration)));
        self.recent.push_back(duration);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        if error {
            self.error_count += 1;
        }
    }
}

/// Metrics for a single backend: one set of counters per operation kind.
#[derive(Debug, Clone)]
pub struct BackendMetrics {
    pub read: OperationMetrics,
    pub write: OperationMetrics,
    pub last_update: Instant,
}

impl Default for BackendMetrics {
    fn default() -> Self {
        Self {
            read: OperationMetrics::default(),
            write: OperationMetrics::default(),
            last_update: Instant::now(),
        }
    }
}

impl BackendMetrics {
    fn record(&mut self, operation: Operation, duration: Duration, error: bool) {
        match operation {
            Operation::Read => self.read.update(duration, error),
            Operation::Write => self.write.update(duration, error),
        }
        self.last_update = Instant::now();
    }
}

/// Serialized per-backend performance monitor, shared behind an `Arc`.
///
/// All state lives behind a single lock, matching the original's
/// `PerformanceMonitor._lock` — contention is expected to be low since
/// recording happens once per backend operation, not per pin.
#[derive(Default)]
pub struct PerformanceMonitor {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    backends: std::collections::HashMap<String, BackendMetrics>,
    last_cleanup: Option<Instant>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_operation(
        &self,
        backend_name: &str,
        operation: Operation,
        duration: Duration,
        error: bool,
    ) {
        let mut inner = self.inner.lock().await;
        inner
            .backends
            .entry(backend_name.to_string())
            .or_default()
            .record(operation, duration, error);

        let now = Instant::now();
        let due = match inner.last_cleanup {
            Some(last) => now.duration_since(last) > CLEANUP_INTERVAL,
            None => false,
        };
        if due {
            Self::cleanup_stale(&mut inner.backends);
            inner.last_cleanup = Some(now);
        } else if inner.last_cleanup.is_none() {
            inner.last_cleanup = Some(now);
        }
    }

    pub async fn snapshot(&self, backend_name: &str) -> Option<BackendMetrics> {
        self.inner.lock().await.backends.get(backend_name).cloned()
    }

    pub async fn snapshot_all(&self) -> std::collections::HashMap<String, BackendMetrics> {
        self.inner.lock().await.backends.clone()
    }

    fn cleanup_stale(backends: &mut std::collections::HashMap<String, BackendMetrics>) {
        let now = Instant::now();
        backends.retain(|name, metrics| {
            let keep = now.duration_since(metrics.last_update) <= STALE_TIMEOUT;
            if !keep {
                tracing::debug!(backend = name.as_str(), "evicting stale backend metrics");
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_read_and_write_independently() {
        let monitor = PerformanceMonitor::new();
        monitor
            .record_operation("sim", Operation::Read, Duration::from_millis(1), false)
            .await;
        monitor
            .record_operation("sim", Operation::Write, Duration::from_millis(2), true)
            .await;

        let snap = monitor.snapshot("sim").await.unwrap();
        assert_eq!(snap.read.count, 1);
        assert_eq!(snap.write.count, 1);
        assert_eq!(snap.write.error_count, 1);
        assert_eq!(snap.read.error_count, 0);
    }

    #[tokio::test]
    async fn unknown_backend_has_no_snapshot() {
        let monitor = PerformanceMonitor::new();
        assert!(monitor.snapshot("nope").await.is_none());
    }

    #[tokio::test]
    async fn recent_window_is_bounded() {
        let monitor = PerformanceMonitor::new();
        for _ in 0..(RECENT_WINDOW + 10) {
            monitor
                .record_operation("sim", Operation::Read, Duration::from_micros(10), false)
                .await;
        }
        let snap = monitor.snapshot("sim").await.unwrap();
        assert_eq!(snap.read.count, (RECENT_WINDOW + 10) as u64);
        assert_eq!(snap.read.recent_avg(), Duration::from_micros(10));
    }
}
