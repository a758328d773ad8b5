use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use iocontrol_types::IoPoint;

/// The full set of I/O points under runtime management. Serializes as
/// `{"io_points": [...]}`, the same shape the validator and manager both
/// consume.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub io_points: Vec<IoPoint>,
}

impl RawConfig {
    pub fn find(&self, name: &str) -> Option<&IoPoint> {
        self.io_points.iter().find(|p| p.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.io_points.iter().position(|p| p.name == name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
    Modify,
    Rollback,
    ExternalReload,
}

/// One recorded configuration mutation (spec §4.11 supplemented
/// feature): carries `user` through every mutating call, mirroring
/// `original_source/src/iocontrol/config.py`'s `ConfigChange`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigChange {
    pub timestamp: DateTime<Utc>,
    pub change_type: ChangeKind,
    pub point_name: String,
    pub old_config: Option<IoPoint>,
    pub new_config: Option<IoPoint>,
    pub user: String,
}

impl ConfigChange {
    pub fn new(
        change_type: ChangeKind,
        point_name: impl Into<String>,
        old_config: Option<IoPoint>,
        new_config: Option<IoPoint>,
        user: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: now,
            change_type,
            point_name: point_name.into(),
            old_config,
            new_config,
            user: user.into(),
        }
    }
}

/// A versioned point-in-time copy of the configuration, bounded to the
/// last 50 in `RuntimeConfigManager` history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub timestamp: DateTime<Utc>,
    pub config: RawConfig,
    pub version: u64,
    pub changes_since_last: Vec<ConfigChange>,
}
