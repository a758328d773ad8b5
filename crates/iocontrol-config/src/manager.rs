use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use futures::future::FutureExt;
use iocontrol_validator::ConfigValidator;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::callback::ChangeCallback;
use crate::change::{ChangeKind, ConfigChange, ConfigSnapshot, RawConfig};
use crate::error::ConfigError;
use iocontrol_types::IoPoint;

const MAX_HISTORY: usize = 50;
const FILE_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Runtime configuration management and hot-reloading (spec §4.11).
/// Grounded on `original_source/src/iocontrol/config.py`'s
/// `RuntimeConfigManager`: versioned snapshots, per-point mutation
/// tracking, optional validation before mutations apply, and an optional
/// mtime-polling file watcher.
pub struct RuntimeConfigManager {
    config_path: Mutex<Option<PathBuf>>,
    current: Mutex<RawConfig>,
    history: Mutex<Vec<ConfigSnapshot>>,
    // Plain blocking mutex: registration is not hot-path, and dispatch only
    // ever holds it long enough to clone the listener list, never across
    // an `.await`.
    callbacks: StdMutex<Vec<ChangeCallback>>,
    version: Mutex<u64>,
    last_mtime: Mutex<Option<SystemTime>>,
    file_watcher: Mutex<Option<JoinHandle<()>>>,
    validator: Option<ConfigValidator>,
}

impl RuntimeConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        // Version 0 is the empty configuration this manager starts with.
        // Seeding its snapshot up front means every version number that
        // was ever current stays reachable by `rollback_to_version`,
        // including rolling all the way back to nothing.
        let initial_snapshot = ConfigSnapshot {
            timestamp: Utc::now(),
            config: RawConfig::default(),
            version: 0,
            changes_since_last: Vec::new(),
        };
        Self {
            config_path: Mutex::new(config_path),
            current: Mutex::new(RawConfig::default()),
            history: Mutex::new(vec![initial_snapshot]),
            callbacks: StdMutex::new(Vec::new()),
            version: Mutex::new(0),
            last_mtime: Mutex::new(None),
            file_watcher: Mutex::new(None),
            validator: None,
        }
    }

    /// Enables full schema/semantic/safety validation before every add,
    /// remove, or modify is applied, rejecting the mutation with
    /// [`ConfigError::Invalid`] if it would introduce an `Error`-level
    /// issue.
    pub fn with_validator(mut self, validator: ConfigValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub async fn current_config(&self) -> RawConfig {
        self.current.lock().await.clone()
    }

    pub async fn version(&self) -> u64 {
        *self.version.lock().await
    }

    /// Registers a synchronous listener. Dispatched on a blocking-pool
    /// worker so a slow callback never stalls a config mutation.
    pub fn on_config_change<F>(&self, callback: F)
    where
        F: Fn(&[ConfigChange]) + Send + Sync + 'static,
    {
        self.callbacks.lock().unwrap().push(ChangeCallback::sync(callback));
    }

    /// Registers a cooperative listener, awaited in registration order
    /// alongside other callbacks.
    pub fn on_config_change_async<F, Fut>(&self, callback: F)
    where
        F: Fn(Vec<ConfigChange>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks.lock().unwrap().push(ChangeCallback::cooperative(callback));
    }

    pub async fn get_config_history(&self, limit: usize) -> Vec<ConfigSnapshot> {
        let history = self.history.lock().await;
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    pub async fn load_config(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let new_config = parse_config(path, &contents)?;

        *self.current.lock().await = new_config;
        *self.version.lock().await += 1;
        *self.config_path.lock().await = Some(path.to_path_buf());
        *self.last_mtime.lock().await = file_mtime(path).await;
        self.snapshot(Vec::new()).await;

        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(())
    }

    pub async fn save_config(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self.config_path.lock().await.clone().ok_or(ConfigError::NoConfigPath)?,
        };

        let current = self.current.lock().await.clone();
        let serialized = serialize_config(&target, &current)?;
        tokio::fs::write(&target, serialized).await?;
        *self.last_mtime.lock().await = file_mtime(&target).await;

        tracing::info!(path = %target.display(), "saved configuration");
        Ok(())
    }

    pub async fn add_io_point(&self, point: IoPoint, user: &str) -> Result<(), ConfigError> {
        let mut current = self.current.lock().await;
        if current.find(&point.name).is_some() {
            return Err(ConfigError::PointExists(point.name));
        }

        let mut prospective = current.io_points.clone();
        prospective.push(point.clone());
        self.check_validator(&prospective)?;

        current.io_points.push(point.clone());
        drop(current);

        let change = ConfigChange::new(ChangeKind::Add, &point.name, None, Some(point.clone()), user, Utc::now());
        self.apply_change(change).await;
        tracing::info!(point = %point.name, "added I/O point");
        Ok(())
    }

    pub async fn remove_io_point(&self, name: &str, user: &str) -> Result<(), ConfigError> {
        let mut current = self.current.lock().await;
        let index = current.position(name).ok_or_else(|| ConfigError::PointNotFound(name.to_string()))?;
        let removed = current.io_points.remove(index);
        drop(current);

        let change = ConfigChange::new(ChangeKind::Remove, name, Some(removed), None, user, Utc::now());
        self.apply_change(change).await;
        tracing::info!(point = name, "removed I/O point");
        Ok(())
    }

    pub async fn modify_io_point(&self, name: &str, new_point: IoPoint, user: &str) -> Result<(), ConfigError> {
        let mut current = self.current.lock().await;
        let index = current.position(name).ok_or_else(|| ConfigError::PointNotFound(name.to_string()))?;

        let mut prospective = current.io_points.clone();
        prospective[index] = new_point.clone();
        self.check_validator(&prospective)?;

        let old = current.io_points[index].clone();
        current.io_points[index] = new_point.clone();
        drop(current);

        let change = ConfigChange::new(ChangeKind::Modify, name, Some(old), Some(new_point), user, Utc::now());
        self.apply_change(change).await;
        tracing::info!(point = name, "modified I/O point");
        Ok(())
    }

    /// Restores configuration to a historic version. A no-op on the point
    /// set when rolling back to the current version, but still bumps the
    /// version and records the change (spec §8). Unlike `add`/`remove`/
    /// `modify`, a rollback isn't about a single point, so its
    /// `ConfigChange` carries no `old_config`/`new_config` — the version
    /// transition is already visible in the snapshot history.
    pub async fn rollback_to_version(&self, version: u64) -> Result<(), ConfigError> {
        let target = {
            let history = self.history.lock().await;
            history
                .iter()
                .rev()
                .find(|snap| snap.version == version)
                .cloned()
                .ok_or(ConfigError::VersionNotFound(version))?
        };

        *self.current.lock().await = target.config;
        let change = ConfigChange::new(ChangeKind::Rollback, "system", None, None, "system", Utc::now());
        self.apply_change(change).await;

        tracing::info!(version, "rolled back configuration");
        Ok(())
    }

    pub async fn start_file_watching(self: &Arc<Self>) {
        let has_path = self.config_path.lock().await.is_some();
        let mut watcher = self.file_watcher.lock().await;
        if !has_path || watcher.is_some() {
            return;
        }

        let this = self.clone();
        *watcher = Some(tokio::spawn(async move { this.file_watcher_loop().await }));
        tracing::info!("started watching config file");
    }

    pub async fn stop_file_watching(&self) {
        if let Some(handle) = self.file_watcher.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    async fn file_watcher_loop(self: Arc<Self>) {
        loop {
            let path = self.config_path.lock().await.clone();
            if let Some(path) = path {
                if let Some(mtime) = file_mtime(&path).await {
                    let stale = match *self.last_mtime.lock().await {
                        Some(last) => mtime > last,
                        None => false,
                    };
                    if stale {
                        tracing::info!("config file changed externally, reloading");
                        if self.load_config(&path).await.is_ok() {
                            let change = ConfigChange::new(
                                ChangeKind::ExternalReload,
                                "system",
                                None,
                                None,
                                "external",
                                Utc::now(),
                            );
                            self.apply_change(change).await;
                        }
                    }
                }
            }
            tokio::time::sleep(FILE_WATCH_INTERVAL).await;
        }
    }

    fn check_validator(&self, prospective: &[IoPoint]) -> Result<(), ConfigError> {
        if let Some(validator) = &self.validator {
            let issues = validator.validate(prospective);
            if !iocontrol_validator::is_valid(&issues) {
                return Err(ConfigError::Invalid(issues));
            }
        }
        Ok(())
    }

    async fn apply_change(&self, change: ConfigChange) {
        *self.version.lock().await += 1;
        self.snapshot(vec![change.clone()]).await;
        self.notify_changes(vec![change]).await;
    }

    async fn snapshot(&self, changes: Vec<ConfigChange>) {
        let snapshot = ConfigSnapshot {
            timestamp: Utc::now(),
            config: self.current.lock().await.clone(),
            version: *self.version.lock().await,
            changes_since_last: changes,
        };
        let mut history = self.history.lock().await;
        history.push(snapshot);
        if history.len() > MAX_HISTORY {
            history.remove(0);
        }
    }

    /// Dispatches a batch of changes to every registered listener in
    /// registration order. A panicking or erroring callback is logged and
    /// does not stop the rest of the batch, mirroring the original's
    /// per-callback try/except around `_notify_changes` (spec §4.8).
    async fn notify_changes(&self, changes: Vec<ConfigChange>) {
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
                        Ok(Err(_)) => tracing::error!("config change callback panicked"),
                        Err(e) => tracing::error!(error = %e, "config change callback task failed"),
                    }
                }
                ChangeCallback::Async(callback) => {
                    let fut = callback(changes.clone());
                    if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                        tracing::error!("config change callback panicked");
                    }
                }
            }
        }
    }
}

fn parse_config(path: &Path, contents: &str) -> Result<RawConfig, ConfigError> {
    if is_yaml(path) {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    } else {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn serialize_config(path: &Path, config: &RawConfig) -> Result<String, ConfigError> {
    if is_yaml(path) {
        serde_yaml::to_string(config).map_err(|e| ConfigError::Parse(e.to_string()))
    } else {
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("yaml") | Some("yml")
    )
}

async fn file_mtime(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}
