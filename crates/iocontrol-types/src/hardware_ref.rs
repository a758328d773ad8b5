use crate::IoError;
use serde::{Deserialize, Serialize};

/// Which backend a `hardware_ref` routes to, per spec §6: a `sim.*` prefix
/// routes to the simulated backend, `mcp*` routes to the expander backend.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BackendKind {
    Simulated,
    Expander,
    Unknown,
}

/// Opaque routing key used to resolve a backend and a backend-local
/// address. Globally unique across points (enforced by the validator).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareRef(pub String);

impl HardwareRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical routing discriminator: the leading token.
    pub fn backend_kind(&self) -> BackendKind {
        if self.0.starts_with("sim") {
            BackendKind::Simulated
        } else if self.0.starts_with("mcp") {
            BackendKind::Expander
        } else {
            BackendKind::Unknown
        }
    }

    /// Parses an expander ref of the form `mcp<chip_hex_address>_<pin>`,
    /// e.g. `mcp20_3` → chip address `0x20`, pin `3`.
    pub fn parse_expander(&self) -> Result<(u8, u8), IoError> {
        let body = self
            .0
            .strip_prefix("mcp")
            .ok_or_else(|| IoError::BadHardwareRef(self.0.clone()))?;
        let (addr_str, pin_str) = body
            .split_once('_')
            .ok_or_else(|| IoError::BadHardwareRef(self.0.clone()))?;
        let address = u8::from_str_radix(addr_str, 16)
            .map_err(|_| IoError::BadHardwareRef(self.0.clone()))?;
        let pin = pin_str
            .parse::<u8>()
            .map_err(|_| IoError::BadHardwareRef(self.0.clone()))?;
        Ok((address, pin))
    }
}

impl std::fmt::Display for HardwareRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_leading_token() {
        assert_eq!(HardwareRef::new("sim.pin0").backend_kind(), BackendKind::Simulated);
        assert_eq!(HardwareRef::new("mcp20_3").backend_kind(), BackendKind::Expander);
        assert_eq!(HardwareRef::new("other").backend_kind(), BackendKind::Unknown);
    }

    #[test]
    fn parses_expander_address_and_pin() {
        let (addr, pin) = HardwareRef::new("mcp20_3").parse_expander().unwrap();
        assert_eq!(addr, 0x20);
        assert_eq!(pin, 3);
    }

    #[test]
    fn rejects_malformed_expander_ref() {
        assert!(HardwareRef::new("mcpxx").parse_expander().is_err());
        assert!(HardwareRef::new("sim.pin0").parse_expander().is_err());
    }
}
