//! In-memory substitute backend for testing without real hardware (spec
//! §4.3). Grounded on `original_source/src/iocontrol/backends.py`'s
//! `SimulatedBackend`, supplemented with the seeded-PRNG error injection
//! called for in Design Note 9: reproducible test runs use
//! `rand_chacha::ChaCha8Rng` seeded at construction rather than the
//! process-global RNG.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use iocontrol_metrics::{Operation, PerformanceMonitor};
use iocontrol_types::{Backend, IoError, IoPoint, Value};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::Mutex;

const DEFAULT_READ_DELAY: Duration = Duration::from_millis(1);
const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(1);

pub struct SimulatedBackend {
    name: String,
    read_delay: Duration,
    write_delay: Duration,
    error_rate: f64,
    rng: Mutex<ChaCha8Rng>,
    state: Mutex<HashMap<String, Value>>,
    points: Mutex<HashMap<String, IoPoint>>,
    metrics: Arc<PerformanceMonitor>,
}

impl SimulatedBackend {
    /// `seed` makes error injection reproducible across runs.
    pub fn new(name: impl Into<String>, seed: u64, metrics: Arc<PerformanceMonitor>) -> Self {
        Self {
            name: name.into(),
            read_delay: DEFAULT_READ_DELAY,
            write_delay: DEFAULT_WRITE_DELAY,
            error_rate: 0.0,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            state: Mutex::new(HashMap::new()),
            points: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// `rate` is clamped to `[0, 1]`; a draw below it fails the operation
    /// with a synthetic hardware error.
    pub fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Latches an input point to a new value, as if hardware changed
    /// underneath the engine. Silently ignored for names the backend
    /// doesn't own, matching the original's guarded dict assignment.
    pub async fn simulate_input_change(&self, point_name: &str, value: Value) {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.get_mut(point_name) {
            *existing = value;
            tracing::debug!(point = point_name, "simulated input change");
        }
    }

    async fn maybe_fail(&self) -> bool {
        if self.error_rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().await;
        rng.gen::<f64>() < self.error_rate
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn initialize(&self, points: &[IoPoint]) -> Result<(), IoError> {
        let mut state = self.state.lock().await;
        let mut owned = self.points.lock().await;
        for point in points {
            let initial = point.initial_state.unwrap_or_else(|| Value::default_for(point.io_type));
            state.insert(point.name.clone(), initial);
            owned.insert(point.name.clone(), point.clone());
        }
        tracing::info!(backend = %self.name, count = points.len(), "simulated backend initialized");
        Ok(())
    }

    async fn read_all(&self) -> Result<HashMap<String, Value>, IoError> {
        let start = Instant::now();
        tokio::time::sleep(self.read_delay).await;

        let failed = self.maybe_fail().await;
        let result = if failed {
            Err(IoError::Hardware(format!("simulated read failure on backend {}", self.name)))
        } else {
            Ok(self.state.lock().await.clone())
        };

        self.metrics.record_operation(&self.name, Operation::Read, start.elapsed(), result.is_err()).await;
        result
    }

    async fn write_point(&self, name: &str, value: Value) -> Result<(), IoError> {
        let start = Instant::now();

        let writable = {
            let points = self.points.lock().await;
            let point = points.get(name).ok_or_else(|| IoError::UnknownPoint(name.to_string()))?;
            if !point.is_writable() {
                return Err(IoError::NotWritable(name.to_string()));
            }
            true
        };
        debug_assert!(writable);

        tokio::time::sleep(self.write_delay).await;
        let failed = self.maybe_fail().await;
        let result = if failed {
            Err(IoError::Hardware(format!("simulated write failure on backend {}", self.name)))
        } else {
            self.state.lock().await.insert(name.to_string(), value);
            Ok(())
        };

        self.metrics.record_operation(&self.name, Operation::Write, start.elapsed(), result.is_err()).await;
        result
    }

    async fn close(&self) {
        self.state.lock().await.clear();
        self.points.lock().await.clear();
        tracing::info!(backend = %self.name, "simulated backend closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iocontrol_types::{HardwareRef, IoType};

    fn point(name: &str, io_type: IoType, initial: Option<Value>) -> IoPoint {
        IoPoint {
            name: name.to_string(),
            io_type,
            hardware_ref: HardwareRef::new(format!("sim.{name}")),
            critical: false,
            interrupt_enabled: false,
            pull_up: false,
            initial_state: initial,
            description: String::new(),
            tags: HashMap::new(),
        }
    }

    fn backend() -> SimulatedBackend {
        SimulatedBackend::new("sim", 42, Arc::new(PerformanceMonitor::new()))
            .with_read_delay(Duration::ZERO)
            .with_write_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn seeds_initial_state_from_points_with_defaults() {
        let backend = backend();
        let points = vec![
            point("relay_1", IoType::DigitalOutput, None),
            point("sensor_1", IoType::AnalogInput, Some(Value::Analog(3.3))),
        ];
        backend.initialize(&points).await.unwrap();

        let state = backend.read_all().await.unwrap();
        assert_eq!(state.get("relay_1"), Some(&Value::Digital(false)));
        assert_eq!(state.get("sensor_1"), Some(&Value::Analog(3.3)));
    }

    #[tokio::test]
    async fn write_rejects_unknown_and_input_points() {
        let backend = backend();
        let points = vec![point("sensor_1", IoType::DigitalInput, None)];
        backend.initialize(&points).await.unwrap();

        assert!(matches!(
            backend.write_point("missing", Value::Digital(true)).await,
            Err(IoError::UnknownPoint(_))
        ));
        assert!(matches!(
            backend.write_point("sensor_1", Value::Digital(true)).await,
            Err(IoError::NotWritable(_))
        ));
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let backend = backend();
        let points = vec![point("relay_1", IoType::DigitalOutput, None)];
        backend.initialize(&points).await.unwrap();

        backend.write_point("relay_1", Value::Digital(true)).await.unwrap();
        let state = backend.read_all().await.unwrap();
        assert_eq!(state.get("relay_1"), Some(&Value::Digital(true)));
    }

    #[tokio::test]
    async fn simulate_input_change_ignores_unknown_names() {
        let backend = backend();
        backend.initialize(&[point("sensor_1", IoType::DigitalInput, None)]).await.unwrap();

        backend.simulate_input_change("does_not_exist", Value::Digital(true)).await;
        backend.simulate_input_change("sensor_1", Value::Digital(true)).await;

        let state = backend.read_all().await.unwrap();
        assert_eq!(state.get("sensor_1"), Some(&Value::Digital(true)));
        assert!(!state.contains_key("does_not_exist"));
    }

    #[tokio::test]
    async fn full_error_rate_always_fails_reads() {
        let backend = SimulatedBackend::new("sim", 7, Arc::new(PerformanceMonitor::new()))
            .with_read_delay(Duration::ZERO)
            .with_error_rate(1.0);
        backend.initialize(&[]).await.unwrap();
        assert!(backend.read_all().await.is_err());
    }

    #[tokio::test]
    async fn zero_error_rate_never_fails_reads() {
        let backend = backend();
        backend.initialize(&[]).await.unwrap();
        for _ in 0..50 {
            assert!(backend.read_all().await.is_ok());
        }
    }
}
