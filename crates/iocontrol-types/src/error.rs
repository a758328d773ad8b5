use thiserror::Error;

/// Closed set of runtime errors surfaced by backends and the manager.
///
/// Mirrors the flat, named shape of the teacher's `ResponseCode` — one
/// enum covering lookup errors, write-target errors, and hardware
/// failures, rather than a tree of nested error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IoError {
    #[error("unknown I/O point: {0}")]
    UnknownPoint(String),

    #[error("point {0} is not writable")]
    NotWritable(String),

    #[error("no backend available for point: {0}")]
    BackendUnavailable(String),

    #[error("backend not initialized")]
    NotInitialized,

    #[error("invalid pin index {pin} (chip has {width} pins)")]
    InvalidPin { pin: u8, width: u8 },

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("malformed hardware_ref: {0}")]
    BadHardwareRef(String),
}
