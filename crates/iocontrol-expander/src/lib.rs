//! Backend driving one or more MCP23017 (16-pin) / MCP23008 (8-pin) I2C
//! GPIO expanders (spec §4.2, §6).
//!
//! Grounded on `original_source/src/iocontrol/backends/mcp23017.py` and
//! `mcp23008.py`: a chip owns its own serialized register access and
//! cached port state, while `ExpanderBackend` routes named points to the
//! right chip/pin via `HardwareRef::parse_expander` and implements the
//! shared `Backend` trait, the same split as the Python `MCPBackend` over
//! per-chip driver objects.

mod backend;
mod chip;
mod config;
mod registers;

pub use backend::ExpanderBackend;
pub use chip::{Chip, Port};
pub use config::{ChipConfig, ChipKind};
