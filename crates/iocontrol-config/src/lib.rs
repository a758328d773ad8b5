//! Runtime configuration management and hot-reloading (spec §4.11).
//!
//! Grounded on `original_source/src/iocontrol/config.py`'s
//! `RuntimeConfigManager`: a version counter, a bounded snapshot history,
//! per-point change tracking, and an optional file watcher for external
//! edits.

mod callback;
mod change;
mod error;
mod manager;

pub use change::{ChangeKind, ConfigChange, ConfigSnapshot, RawConfig};
pub use error::ConfigError;
pub use manager::RuntimeConfigManager;

#[cfg(test)]
mod tests {
    use super::*;
    use iocontrol_types::{HardwareRef, IoPoint, IoType};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn point(name: &str) -> IoPoint {
        IoPoint {
            name: name.to_string(),
            io_type: IoType::DigitalOutput,
            hardware_ref: HardwareRef::new(format!("sim.{name}")),
            critical: false,
            interrupt_enabled: false,
            pull_up: false,
            initial_state: None,
            description: String::new(),
            tags: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn add_remove_modify_bump_version_and_history() {
        let manager = RuntimeConfigManager::new(None);
        assert_eq!(manager.version().await, 0);

        manager.add_io_point(point("relay_1"), "alice").await.unwrap();
        assert_eq!(manager.version().await, 1);
        assert_eq!(manager.current_config().await.io_points.len(), 1);

        let mut modified = point("relay_1");
        modified.critical = true;
        manager.modify_io_point("relay_1", modified, "alice").await.unwrap();
        assert_eq!(manager.version().await, 2);
        assert!(manager.current_config().await.find("relay_1").unwrap().critical);

        manager.remove_io_point("relay_1", "alice").await.unwrap();
        assert_eq!(manager.version().await, 3);
        assert!(manager.current_config().await.io_points.is_empty());

        let history = manager.get_config_history(10).await;
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn add_io_point_rejects_duplicate_name() {
        let manager = RuntimeConfigManager::new(None);
        manager.add_io_point(point("relay_1"), "system").await.unwrap();
        let err = manager.add_io_point(point("relay_1"), "system").await.unwrap_err();
        assert!(matches!(err, ConfigError::PointExists(_)));
    }

    #[tokio::test]
    async fn remove_unknown_point_errors() {
        let manager = RuntimeConfigManager::new(None);
        let err = manager.remove_io_point("nope", "system").await.unwrap_err();
        assert!(matches!(err, ConfigError::PointNotFound(_)));
    }

    #[tokio::test]
    async fn rollback_restores_prior_point_set_and_bumps_version() {
        let manager = RuntimeConfigManager::new(None);
        manager.add_io_point(point("relay_1"), "system").await.unwrap();
        manager.add_io_point(point("relay_2"), "system").await.unwrap();
        assert_eq!(manager.version().await, 2);

        manager.rollback_to_version(1).await.unwrap();
        assert_eq!(manager.version().await, 3);
        assert_eq!(manager.current_config().await.io_points.len(), 1);
        assert!(manager.current_config().await.find("relay_1").is_some());
    }

    #[tokio::test]
    async fn rollback_to_version_zero_restores_empty_config() {
        let manager = RuntimeConfigManager::new(None);
        manager.add_io_point(point("relay_1"), "admin").await.unwrap();
        assert_eq!(manager.current_config().await.io_points.len(), 1);

        manager.rollback_to_version(0).await.unwrap();
        assert!(manager.current_config().await.io_points.is_empty());

        let history = manager.get_config_history(10).await;
        assert_eq!(history.last().unwrap().changes_since_last[0].change_type, ChangeKind::Rollback);
    }

    #[tokio::test]
    async fn rollback_to_unknown_version_errors() {
        let manager = RuntimeConfigManager::new(None);
        let err = manager.rollback_to_version(99).await.unwrap_err();
        assert!(matches!(err, ConfigError::VersionNotFound(99)));
    }

    #[tokio::test]
    async fn callbacks_fire_on_every_mutation() {
        let manager = RuntimeConfigManager::new(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        manager.on_config_change(move |_changes| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        manager.add_io_point(point("relay_1"), "system").await.unwrap();
        manager.remove_io_point("relay_1", "system").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_then_save_round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!("iocontrol-config-test-{}", dir_token()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("config.json");
        tokio::fs::write(&path, r#"{"io_points":[{"name":"relay_1","io_type":"digital_output","hardware_ref":"sim.pin0"}]}"#)
            .await
            .unwrap();

        let manager = RuntimeConfigManager::new(None);
        manager.load_config(&path).await.unwrap();
        assert_eq!(manager.current_config().await.io_points.len(), 1);

        let save_path = dir.join("out.json");
        manager.save_config(Some(&save_path)).await.unwrap();
        let saved = tokio::fs::read_to_string(&save_path).await.unwrap();
        assert!(saved.contains("relay_1"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    fn dir_token() -> usize {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst)
    }
}
