use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{HardwareRef, IoType, Value};

/// A named, logical I/O signal. See spec §3 for the full invariant list;
/// uniqueness of `name`/`hardware_ref` and type-compatibility of
/// `initial_state` are enforced by the validator, not by this type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IoPoint {
    pub name: String,
    pub io_type: IoType,
    pub hardware_ref: HardwareRef,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub interrupt_enabled: bool,
    #[serde(default)]
    pub pull_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl IoPoint {
    pub fn is_writable(&self) -> bool {
        self.io_type.is_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_point_with_defaults() {
        let json = r#"{"name":"relay_1","io_type":"digital_output","hardware_ref":"sim.pin0"}"#;
        let point: IoPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.name, "relay_1");
        assert!(!point.critical);
        assert!(point.initial_state.is_none());
        assert!(point.tags.is_empty());
    }
}
