/// Which chip variant a [`crate::Chip`] speaks to. Determines pin count and
/// register layout (spec §6).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChipKind {
    Mcp23017,
    Mcp23008,
}

impl ChipKind {
    pub fn width(self) -> u8 {
        match self {
            ChipKind::Mcp23017 => 16,
            ChipKind::Mcp23008 => 8,
        }
    }

    pub(crate) fn registers(self) -> crate::registers::ChipRegisters {
        match self {
            ChipKind::Mcp23017 => crate::registers::mcp23017::registers(),
            ChipKind::Mcp23008 => crate::registers::mcp23008::registers(),
        }
    }
}

/// Per-chip initialization options, set once at construction and applied
/// by [`crate::Chip::initialize`].
#[derive(Clone, Debug)]
pub struct ChipConfig {
    pub address: u8,
    pub kind: ChipKind,
    /// Enable weak pull-ups on every pin during init. Individual pins are
    /// still refined per-point by `configure_pin`.
    pub pull_ups: bool,
    pub polarity_inversion: bool,
    /// IOCON sequential-operation bit: when set, reads/writes of both
    /// banks can be done as one 2-byte block transaction.
    pub sequential_operation: bool,
    /// When set, enables change interrupts on every pin at init time.
    pub interrupt_pin: Option<u8>,
}

impl ChipConfig {
    pub fn new(address: u8, kind: ChipKind) -> Self {
        Self {
            address,
            kind,
            pull_ups: false,
            polarity_inversion: false,
            sequential_operation: false,
            interrupt_pin: None,
        }
    }
}
