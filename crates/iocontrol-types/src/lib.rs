//! Shared data model for the I/O control engine: point definitions, the
//! tagged digital/analog value, change events, and the backend contract.
//!
//! Mirrors the teacher's `drv-i2c-types` crate: a small, dependency-light
//! crate that both the server (manager) side and every backend crate
//! compile against, so backends never need to depend on each other.

mod change;
mod error;
mod hardware_ref;
mod point;
mod value;

pub use change::StateChange;
pub use error::IoError;
pub use hardware_ref::{BackendKind, HardwareRef};
pub use point::IoPoint;
pub use value::Value;

use async_trait::async_trait;
use std::collections::HashMap;

/// The four I/O point kinds the engine understands. Closed set, matches
/// the wire strings in the configuration schema exactly.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoType {
    DigitalInput,
    DigitalOutput,
    AnalogInput,
    AnalogOutput,
}

impl IoType {
    pub fn is_digital(self) -> bool {
        matches!(self, IoType::DigitalInput | IoType::DigitalOutput)
    }

    pub fn is_analog(self) -> bool {
        !self.is_digital()
    }

    pub fn is_input(self) -> bool {
        matches!(self, IoType::DigitalInput | IoType::AnalogInput)
    }

    pub fn is_output(self) -> bool {
        !self.is_input()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IoType::DigitalInput => "digital_input",
            IoType::DigitalOutput => "digital_output",
            IoType::AnalogInput => "analog_input",
            IoType::AnalogOutput => "analog_output",
        }
    }
}

/// Hardware abstraction that every backend (simulated, expander, ...)
/// implements. Object-safe so the manager can hold a heterogeneous set of
/// `Box<dyn Backend>` keyed by backend name, the same way the original
/// manager keeps `Dict[str, HardwareBackend]`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// One-shot; idempotent after success. Associates the points this
    /// backend is responsible for.
    async fn initialize(&self, points: &[IoPoint]) -> Result<(), IoError>;

    /// Current view of every point owned by this backend.
    async fn read_all(&self) -> Result<HashMap<String, Value>, IoError>;

    /// Write a single point. Fails for unknown or input points.
    async fn write_point(&self, name: &str, value: Value) -> Result<(), IoError>;

    /// Release resources. Safe to call when never initialized.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_type_roundtrips_through_serde() {
        let json = serde_json::to_string(&IoType::AnalogOutput).unwrap();
        assert_eq!(json, "\"analog_output\"");
        let back: IoType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, IoType::AnalogOutput);
    }

    #[test]
    fn classification_helpers_agree() {
        for ty in [
            IoType::DigitalInput,
            IoType::DigitalOutput,
            IoType::AnalogInput,
            IoType::AnalogOutput,
        ] {
            assert_ne!(ty.is_input(), ty.is_output());
            assert_ne!(ty.is_digital(), ty.is_analog());
        }
    }
}
