use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::FutureExt;
use iocontrol_types::{Backend, IoError, StateChange, Value};

use crate::callback::ChangeCallback;
use crate::{backend_name_for_ref, IoManager};

const LOOP_TICK: Duration = Duration::from_millis(1);

impl IoManager {
    /// Dual-tier scheduler: critical points poll at `critical_interval`,
    /// everything else at `normal_interval`, computed from wall-clock
    /// deltas rather than a fixed-rate timer so a slow tick doesn't starve
    /// either tier — both fire in the same tick if both are due, critical
    /// first (spec §4.6).
    pub(crate) async fn polling_loop(self: Arc<Self>) {
        let mut last_critical = Instant::now() - self.polling_config.critical_interval;
        let mut last_normal = Instant::now() - self.polling_config.normal_interval;

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            let critical_due = now.duration_since(last_critical) >= self.polling_config.critical_interval;
            let normal_due = now.duration_since(last_normal) >= self.polling_config.normal_interval;

            let tick: Result<(), IoError> = async {
                if critical_due {
                    self.poll_critical_points().await?;
                }
                if normal_due {
                    self.poll_all_points().await?;
                }
                self.process_pending_writes().await?;
                Ok(())
            }
            .await;

            match tick {
                Ok(()) => {
                    if critical_due {
                        last_critical = now;
                    }
                    if normal_due {
                        last_normal = now;
                    }
                    tokio::time::sleep(LOOP_TICK).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "error in polling loop");
                    tokio::time::sleep(self.polling_config.normal_interval).await;
                }
            }
        }
        tracing::info!("polling loop stopped");
    }

    async fn poll_critical_points(&self) -> Result<(), IoError> {
        let critical = self.critical_points.lock().await.clone();
        if critical.is_empty() {
            return Ok(());
        }

        let backend_names = {
            let points = self.points.lock().await;
            critical
                .iter()
                .filter_map(|name| points.get(name))
                .filter_map(|point| backend_name_for_ref(&point.hardware_ref))
                .collect::<std::collections::HashSet<_>>()
        };

        let backends: Vec<Arc<dyn Backend>> = {
            let registered = self.backends.lock().await;
            backend_names.iter().filter_map(|name| registered.get(*name).cloned()).collect()
        };

        let results = futures::future::join_all(backends.iter().map(|b| b.read_all())).await;
        let changes = self.apply_reads(results, Some(&critical)).await;
        if !changes.is_empty() {
            self.notify_changes(changes).await;
        }
        Ok(())
    }

    async fn poll_all_points(&self) -> Result<(), IoError> {
        let backends: Vec<Arc<dyn Backend>> = self.backends.lock().await.values().cloned().collect();
        let results = futures::future::join_all(backends.iter().map(|b| b.read_all())).await;
        let changes = self.apply_reads(results, None).await;
        if !changes.is_empty() {
            self.notify_changes(changes).await;
        }
        Ok(())
    }

    /// Merges a batch of `read_all` results into `current_states`,
    /// restricted to `only` when set (critical tier), emitting a
    /// [`StateChange`] for every value that actually moved. Failed reads
    /// are logged and skipped so one bad backend doesn't block the rest.
    async fn apply_reads(
        &self,
        results: Vec<Result<std::collections::HashMap<String, Value>, IoError>>,
        only: Option<&std::collections::HashSet<String>>,
    ) -> Vec<StateChange> {
        let mut changes = Vec::new();
        let mut states = self.current_states.lock().await;
        let points = self.points.lock().await;

        for result in results {
            let values = match result {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(error = %e, "backend poll read failed");
                    continue;
                }
            };
            for (name, new_value) in values {
                if let Some(only) = only {
                    if !only.contains(&name) {
                        continue;
                    }
                }
                let old_value = states.get(&name).copied();
                if old_value == Some(new_value) {
                    continue;
                }
                states.insert(name.clone(), new_value);
                if let Some(point) = points.get(&name) {
                    changes.push(StateChange::now(
                        name.clone(),
                        old_value.unwrap_or(new_value),
                        new_value,
                        point.hardware_ref.to_string(),
                    ));
                }
            }
        }
        changes
    }

    async fn process_pending_writes(&self) -> Result<(), IoError> {
        let pending: Vec<(String, Value)> = {
            let mut pending = self.pending_writes.lock().await;
            pending.drain().collect()
        };
        if pending.is_empty() {
            return Ok(());
        }

        let mut by_backend: std::collections::HashMap<&'static str, Vec<(String, Value)>> = std::collections::HashMap::new();
        {
            let points = self.points.lock().await;
            for (name, value) in pending {
                if let Some(point) = points.get(&name) {
                    if let Some(backend_name) = backend_name_for_ref(&point.hardware_ref) {
                        by_backend.entry(backend_name).or_default().push((name, value));
                    }
                }
            }
        }

        let registered = self.backends.lock().await;
        let mut write_futures = Vec::new();
        for (backend_name, writes) in by_backend {
            if let Some(backend) = registered.get(backend_name).cloned() {
                for (name, value) in writes {
                    let backend = backend.clone();
                    write_futures.push(async move { backend.write_point(&name, value).await });
                }
            }
        }
        drop(registered);

        let results = futures::future::join_all(write_futures).await;
        for result in results {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to flush pending write");
            }
        }
        Ok(())
    }

    /// Dispatches a batch of changes to every registered listener in
    /// registration order. Sync listeners run on a blocking-pool worker so
    /// they never stall the scheduler; async listeners are awaited in
    /// place. A panicking or erroring callback is logged and does not stop
    /// the rest of the batch, mirroring the original's per-callback
    /// try/except around `_notify_changes` (spec §4.8).
    pub(crate) async fn notify_changes(&self, changes: Vec<StateChange>) {
        let callbacks = self.callbacks.lock().unwrap().clone();
        for callback in callbacks.iter() {
            match callback {
                ChangeCallback::Sync(callback) => {
                    let callback = callback.clone();
                    let changes = changes.clone();
                    let result =
                        tokio::task::spawn_blocking(move || std::panic::catch_unwind(AssertUnwindSafe(|| callback(changes)))).await;
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => tracing::error!("change callback panicked"),
                        Err(e) => tracing::error!(error = %e, "change callback task failed"),
                    }
                }
                ChangeCallback::Async(callback) => {
                    let fut = callback(changes.clone());
                    if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                        tracing::error!("change callback panicked");
                    }
                }
            }
        }
    }
}
