//! Bit-exact register maps for the MCP23017 (16-pin, two banks) and
//! MCP23008 (8-pin, one bank), per spec §6.

/// One chip's register addresses, normalized to an A/B-bank shape. For
/// the MCP23008 (one bank), every `*_b` field is `None`.
#[derive(Copy, Clone, Debug)]
pub struct ChipRegisters {
    pub iodir_a: u8,
    pub iodir_b: Option<u8>,
    pub ipol_a: u8,
    pub ipol_b: Option<u8>,
    pub gpinten_a: u8,
    pub gpinten_b: Option<u8>,
    pub intcon_a: u8,
    pub intcon_b: Option<u8>,
    pub iocon_a: u8,
    pub iocon_b: Option<u8>,
    pub gppu_a: u8,
    pub gppu_b: Option<u8>,
    pub gpio_a: u8,
    pub gpio_b: Option<u8>,
}

pub const IOCON_SEQUENTIAL_BIT: u8 = 0x20;

pub mod mcp23017 {
    pub const IODIRA: u8 = 0x00;
    pub const IODIRB: u8 = 0x01;
    pub const IPOLA: u8 = 0x02;
    pub const IPOLB: u8 = 0x03;
    pub const GPINTENA: u8 = 0x04;
    pub const GPINTENB: u8 = 0x05;
    pub const DEFVALA: u8 = 0x06;
    pub const DEFVALB: u8 = 0x07;
    pub const INTCONA: u8 = 0x08;
    pub const INTCONB: u8 = 0x09;
    pub const IOCONA: u8 = 0x0A;
    pub const IOCONB: u8 = 0x0B;
    pub const GPPUA: u8 = 0x0C;
    pub const GPPUB: u8 = 0x0D;
    pub const INTFA: u8 = 0x0E;
    pub const INTFB: u8 = 0x0F;
    pub const INTCAPA: u8 = 0x10;
    pub const INTCAPB: u8 = 0x11;
    pub const GPIOA: u8 = 0x12;
    pub const GPIOB: u8 = 0x13;
    pub const OLATA: u8 = 0x14;
    pub const OLATB: u8 = 0x15;

    pub fn registers() -> super::ChipRegisters {
        super::ChipRegisters {
            iodir_a: IODIRA,
            iodir_b: Some(IODIRB),
            ipol_a: IPOLA,
            ipol_b: Some(IPOLB),
            gpinten_a: GPINTENA,
            gpinten_b: Some(GPINTENB),
            intcon_a: INTCONA,
            intcon_b: Some(INTCONB),
            iocon_a: IOCONA,
            iocon_b: Some(IOCONB),
            gppu_a: GPPUA,
            gppu_b: Some(GPPUB),
            gpio_a: GPIOA,
            gpio_b: Some(GPIOB),
        }
    }
}

pub mod mcp23008 {
    pub const IODIR: u8 = 0x00;
    pub const IPOL: u8 = 0x01;
    pub const GPINTEN: u8 = 0x02;
    pub const DEFVAL: u8 = 0x03;
    pub const INTCON: u8 = 0x04;
    pub const IOCON: u8 = 0x05;
    pub const GPPU: u8 = 0x06;
    pub const INTF: u8 = 0x07;
    pub const INTCAP: u8 = 0x08;
    pub const GPIO: u8 = 0x09;
    pub const OLAT: u8 = 0x0A;

    pub fn registers() -> super::ChipRegisters {
        super::ChipRegisters {
            iodir_a: IODIR,
            iodir_b: None,
            ipol_a: IPOL,
            ipol_b: None,
            gpinten_a: GPINTEN,
            gpinten_b: None,
            intcon_a: INTCON,
            intcon_b: None,
            iocon_a: IOCON,
            iocon_b: None,
            gppu_a: GPPU,
            gppu_b: None,
            gpio_a: GPIO,
            gpio_b: None,
        }
    }
}
