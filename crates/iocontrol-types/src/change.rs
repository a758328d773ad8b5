use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::Value;

/// A timestamped transition event for a point, emitted whenever the
/// observed value of a point differs from its last cached value, or a
/// write latches a new value (spec §3/§6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StateChange {
    pub point_name: String,
    pub old_value: Value,
    pub new_value: Value,
    /// Seconds since the Unix epoch, matching spec §6's
    /// `timestamp: seconds_since_epoch_float`.
    pub timestamp: f64,
    pub hardware_ref: String,
}

impl StateChange {
    /// Builds a change event stamped with the current wall-clock time.
    pub fn now(point_name: impl Into<String>, old_value: Value, new_value: Value, hardware_ref: impl Into<String>) -> Self {
        Self {
            point_name: point_name.into(),
            old_value,
            new_value,
            timestamp: unix_timestamp(),
            hardware_ref: hardware_ref.into(),
        }
    }
}

pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_constructor_fills_all_fields() {
        let change = StateChange::now("p", Value::Digital(false), Value::Digital(true), "sim.pin0");
        assert_eq!(change.point_name, "p");
        assert_eq!(change.old_value, Value::Digital(false));
        assert_eq!(change.new_value, Value::Digital(true));
        assert!(change.timestamp > 0.0);
    }
}
