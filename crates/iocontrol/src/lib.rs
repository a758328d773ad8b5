//! Facade crate for the async I/O control engine: re-exports the public
//! surface of every member crate so a consumer depends on one crate
//! instead of wiring up `iocontrol-manager`, `iocontrol-config`, and the
//! rest by hand.
//!
//! Mirrors the teacher's top-level `-api` aggregation crates: thin,
//! re-export-only, no logic of its own.

pub use iocontrol_types::{Backend, BackendKind, HardwareRef, IoError, IoPoint, IoType, StateChange, Value};

pub use iocontrol_metrics::{BackendMetrics, Operation, OperationMetrics, PerformanceMonitor};

pub use iocontrol_transport::{I2cBus, I2cTransport, LinuxI2cBus, MemoryI2cBus, TransportError};

pub use iocontrol_expander::{Chip, ChipConfig, ChipKind, ExpanderBackend, Port};

pub use iocontrol_sim::SimulatedBackend;

pub use iocontrol_validator::{is_valid, ConfigValidator, ValidationIssue, ValidationLevel};

pub use iocontrol_config::{ChangeKind, ConfigChange, ConfigError, ConfigSnapshot, RawConfig, RuntimeConfigManager};

pub use iocontrol_manager::{IoManager, ManagerError, ManagerOptions, PollingConfig};
