//! The async I/O manager: owns every backend and point, keeps a cached
//! view of current state, and runs the dual-tier polling scheduler (spec
//! §4.5–§4.10).
//!
//! Grounded on `original_source/src/iocontrol/core/manager.py`'s
//! `IoManager`: the same lock-per-concern layout (points, state, pending
//! writes), the same fixed `sim`/`mcp` → `"simulator"`/`"mcp"` backend
//! routing, and the same wall-clock-delta polling loop, translated from
//! `asyncio.Lock`/`asyncio.Task` into `tokio::sync::Mutex`/
//! `tokio::task::JoinHandle`.

mod callback;
mod error;
mod options;
mod scheduler;

pub use error::ManagerError;
pub use options::{ManagerOptions, PollingConfig};

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use callback::ChangeCallback;
use iocontrol_metrics::{Operation, PerformanceMonitor};
use iocontrol_types::{Backend, BackendKind, HardwareRef, IoError, IoPoint, StateChange, Value};
use iocontrol_validator::ConfigValidator;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Fixed routing from a point's `hardware_ref` prefix to the backend name
/// it's expected to be registered under (spec §6).
pub(crate) fn backend_name_for_ref(hardware_ref: &HardwareRef) -> Option<&'static str> {
    match hardware_ref.backend_kind() {
        BackendKind::Simulated => Some("simulator"),
        BackendKind::Expander => Some("mcp"),
        BackendKind::Unknown => None,
    }
}

pub struct IoManager {
    backends: Mutex<HashMap<String, Arc<dyn Backend>>>,
    points: Mutex<HashMap<String, IoPoint>>,
    critical_points: Mutex<HashSet<String>>,
    current_states: Mutex<HashMap<String, Value>>,
    pending_writes: Mutex<HashMap<String, Value>>,
    // Plain blocking mutex: registration is not on the polling hot path, and
    // dispatch (scheduler.rs) only ever holds it long enough to clone the
    // listener list, never across an `.await`.
    callbacks: StdMutex<Vec<ChangeCallback>>,
    metrics: Arc<PerformanceMonitor>,
    polling_config: PollingConfig,
    options: ManagerOptions,
    validator: Option<ConfigValidator>,
    running: AtomicBool,
    polling_task: Mutex<Option<JoinHandle<()>>>,
}

impl IoManager {
    pub fn new(polling_config: PollingConfig, options: ManagerOptions) -> Self {
        Self {
            backends: Mutex::new(HashMap::new()),
            points: Mutex::new(HashMap::new()),
            critical_points: Mutex::new(HashSet::new()),
            current_states: Mutex::new(HashMap::new()),
            pending_writes: Mutex::new(HashMap::new()),
            callbacks: StdMutex::new(Vec::new()),
            metrics: Arc::new(PerformanceMonitor::new()),
            polling_config,
            options,
            validator: None,
            running: AtomicBool::new(false),
            polling_task: Mutex::new(None),
        }
    }

    pub fn with_validator(mut self, validator: ConfigValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn metrics(&self) -> Arc<PerformanceMonitor> {
        self.metrics.clone()
    }

    pub async fn add_backend(&self, name: impl Into<String>, backend: Arc<dyn Backend>) {
        let name = name.into();
        self.backends.lock().await.insert(name.clone(), backend);
        tracing::info!(backend = %name, "added backend");
    }

    /// Registers points, initializes every backend that owns at least one
    /// of them, and primes `current_states` (spec §4.5).
    pub async fn configure_from_dict(&self, points: Vec<IoPoint>) -> Result<(), ManagerError> {
        if self.options.validate_on_configure {
            if let Some(validator) = &self.validator {
                let issues = validator.validate(&points);
                if !iocontrol_validator::is_valid(&issues) {
                    return Err(ManagerError::Invalid(issues));
                }
            }
        }

        let mut critical = HashSet::new();
        for point in &points {
            if point.critical {
                critical.insert(point.name.clone());
            }
        }

        {
            let backends = self.backends.lock().await;
            let mut init_futures = Vec::new();
            for (backend_name, backend) in backends.iter() {
                let backend_points: Vec<IoPoint> = points
                    .iter()
                    .filter(|p| backend_name_for_ref(&p.hardware_ref) == Some(backend_name.as_str()))
                    .cloned()
                    .collect();
                if !backend_points.is_empty() {
                    let backend = backend.clone();
                    init_futures.push(async move { backend.initialize(&backend_points).await });
                }
            }
            futures::future::try_join_all(init_futures).await?;
        }

        *self.points.lock().await = points.into_iter().map(|p| (p.name.clone(), p)).collect();
        *self.critical_points.lock().await = critical;

        self.initialize_states().await;
        tracing::info!(count = self.points.lock().await.len(), "configured I/O points");
        Ok(())
    }

    async fn initialize_states(&self) {
        let backends: Vec<Arc<dyn Backend>> = self.backends.lock().await.values().cloned().collect();
        let results = futures::future::join_all(backends.iter().map(|b| b.read_all())).await;

        let mut states = self.current_states.lock().await;
        for result in results {
            match result {
                Ok(values) => states.extend(values),
                Err(e) => tracing::error!(error = %e, "failed to read initial states"),
            }
        }

        let points = self.points.lock().await;
        for (name, point) in points.iter() {
            states.entry(name.clone()).or_insert_with(|| Value::default_for(point.io_type));
        }
    }

    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        *self.polling_task.lock().await = Some(tokio::spawn(async move { this.polling_loop().await }));
        tracing::info!("I/O manager started");
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.polling_task.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        let backends: Vec<Arc<dyn Backend>> = self.backends.lock().await.values().cloned().collect();
        futures::future::join_all(backends.iter().map(|b| b.close())).await;
        tracing::info!("I/O manager stopped");
    }

    pub async fn read(&self, point_name: &str) -> Result<Value, IoError> {
        let start = Instant::now();
        let result = self.read_inner(point_name).await;
        let backend_name = self.backend_name_for_point(point_name).await;
        self.record(backend_name, Operation::Read, start, &result).await;
        result
    }

    async fn read_inner(&self, point_name: &str) -> Result<Value, IoError> {
        {
            let states = self.current_states.lock().await;
            if let Some(value) = states.get(point_name) {
                return Ok(*value);
            }
        }

        let point = self
            .points
            .lock()
            .await
            .get(point_name)
            .cloned()
            .ok_or_else(|| IoError::UnknownPoint(point_name.to_string()))?;
        let backend_name =
            backend_name_for_ref(&point.hardware_ref).ok_or_else(|| IoError::BackendUnavailable(point_name.to_string()))?;
        let backend = self
            .backends
            .lock()
            .await
            .get(backend_name)
            .cloned()
            .ok_or_else(|| IoError::BackendUnavailable(point_name.to_string()))?;

        let values = backend.read_all().await?;
        let value = values
            .get(point_name)
            .copied()
            .ok_or_else(|| IoError::UnknownPoint(point_name.to_string()))?;
        self.current_states.lock().await.insert(point_name.to_string(), value);
        Ok(value)
    }

    pub async fn write(&self, point_name: &str, value: Value) -> Result<(), IoError> {
        let start = Instant::now();
        let result = self.write_inner(point_name, value).await;
        let backend_name = self.backend_name_for_point(point_name).await;
        self.record(backend_name, Operation::Write, start, &result).await;
        result
    }

    async fn write_inner(&self, point_name: &str, value: Value) -> Result<(), IoError> {
        let point = self
            .points
            .lock()
            .await
            .get(point_name)
            .cloned()
            .ok_or_else(|| IoError::UnknownPoint(point_name.to_string()))?;
        if !point.is_writable() {
            return Err(IoError::NotWritable(point_name.to_string()));
        }

        self.pending_writes.lock().await.insert(point_name.to_string(), value);

        let old_value = {
            let mut states = self.current_states.lock().await;
            let old = states.get(point_name).copied();
            states.insert(point_name.to_string(), value);
            old
        };

        if old_value != Some(value) {
            let change = StateChange::now(point_name, old_value.unwrap_or(value), value, point.hardware_ref.to_string());
            self.notify_changes(vec![change]).await;
        }
        Ok(())
    }

    pub async fn read_all(&self) -> HashMap<String, Value> {
        self.current_states.lock().await.clone()
    }

    /// Registers a synchronous listener. Dispatched on a blocking-pool
    /// worker, outside the scheduler's critical path (spec §4.8).
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&[StateChange]) + Send + Sync + 'static,
    {
        self.callbacks.lock().unwrap().push(ChangeCallback::sync(callback));
    }

    /// Registers a cooperative listener, awaited in registration order
    /// alongside other callbacks on the change bus (spec §4.8).
    pub fn on_change_async<F, Fut>(&self, callback: F)
    where
        F: Fn(Vec<StateChange>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks.lock().unwrap().push(ChangeCallback::cooperative(callback));
    }

    async fn backend_name_for_point(&self, point_name: &str) -> Option<&'static str> {
        let points = self.points.lock().await;
        points.get(point_name).and_then(|p| backend_name_for_ref(&p.hardware_ref))
    }

    async fn record<T>(&self, backend_name: Option<&'static str>, operation: Operation, start: Instant, result: &Result<T, IoError>) {
        if let Some(name) = backend_name {
            self.metrics.record_operation(name, operation, start.elapsed(), result.is_err()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iocontrol_sim::SimulatedBackend;
    use iocontrol_types::IoType;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn point(name: &str, io_type: IoType, critical: bool) -> IoPoint {
        IoPoint {
            name: name.to_string(),
            io_type,
            hardware_ref: HardwareRef::new(format!("sim.{name}")),
            critical,
            interrupt_enabled: false,
            pull_up: false,
            initial_state: None,
            description: String::new(),
            tags: Default::default(),
        }
    }

    async fn manager_with_simulator() -> Arc<IoManager> {
        let manager = Arc::new(IoManager::new(PollingConfig::default(), ManagerOptions::default()));
        let backend = Arc::new(
            SimulatedBackend::new("sim", 1, manager.metrics()).with_read_delay(Duration::ZERO).with_write_delay(Duration::ZERO),
        );
        manager.add_backend("simulator", backend).await;
        manager
    }

    #[tokio::test]
    async fn configure_primes_state_from_backend_defaults() {
        let manager = manager_with_simulator().await;
        manager
            .configure_from_dict(vec![point("relay_1", IoType::DigitalOutput, false), point("sensor_1", IoType::AnalogInput, false)])
            .await
            .unwrap();

        assert_eq!(manager.read("relay_1").await.unwrap(), Value::Digital(false));
        assert_eq!(manager.read("sensor_1").await.unwrap(), Value::Analog(0.0));
    }

    #[tokio::test]
    async fn write_rejects_inputs_and_unknown_points() {
        let manager = manager_with_simulator().await;
        manager.configure_from_dict(vec![point("sensor_1", IoType::DigitalInput, false)]).await.unwrap();

        assert!(matches!(manager.write("sensor_1", Value::Digital(true)).await, Err(IoError::NotWritable(_))));
        assert!(matches!(manager.write("missing", Value::Digital(true)).await, Err(IoError::UnknownPoint(_))));
    }

    #[tokio::test]
    async fn write_then_read_round_trips_through_cache() {
        let manager = manager_with_simulator().await;
        manager.configure_from_dict(vec![point("relay_1", IoType::DigitalOutput, false)]).await.unwrap();

        manager.write("relay_1", Value::Digital(true)).await.unwrap();
        assert_eq!(manager.read("relay_1").await.unwrap(), Value::Digital(true));
    }

    #[tokio::test]
    async fn on_change_callback_fires_on_write() {
        let manager = manager_with_simulator().await;
        manager.configure_from_dict(vec![point("relay_1", IoType::DigitalOutput, false)]).await.unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        manager.on_change(move |changes| {
            seen_clone.fetch_add(changes.len(), Ordering::SeqCst);
        });

        manager.write("relay_1", Value::Digital(true)).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_and_stop_round_trip_the_polling_task() {
        let manager = manager_with_simulator().await;
        manager.configure_from_dict(vec![point("relay_1", IoType::DigitalOutput, true)]).await.unwrap();

        manager.start().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.stop().await;

        assert_eq!(manager.read("relay_1").await.unwrap(), Value::Digital(false));
    }

    #[tokio::test]
    async fn configure_rejects_invalid_points_when_validation_enabled() {
        let manager = Arc::new(
            IoManager::new(PollingConfig::default(), ManagerOptions { validate_on_configure: true })
                .with_validator(ConfigValidator::new()),
        );
        let backend = Arc::new(SimulatedBackend::new("sim", 1, manager.metrics()));
        manager.add_backend("simulator", backend).await;

        let bad = point("", IoType::DigitalOutput, false);
        assert!(matches!(manager.configure_from_dict(vec![bad]).await, Err(ManagerError::Invalid(_))));
    }
}
