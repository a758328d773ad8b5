use iocontrol_transport::I2cTransport;
use iocontrol_types::IoError;
use tokio::sync::Mutex;

use crate::config::{ChipConfig, ChipKind};
use crate::registers::IOCON_SEQUENTIAL_BIT;

fn hw_err(e: iocontrol_transport::TransportError) -> IoError {
    IoError::Hardware(e.to_string())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Port {
    A,
    B,
}

/// One physical MCP23017/MCP23008 chip. All register access goes through
/// `state`, serializing operations against this chip the way the original
/// guards each chip with its own `asyncio.Lock` — distinct chips still run
/// concurrently since each owns an independent [`I2cTransport`] and lock.
pub struct Chip {
    pub config: ChipConfig,
    transport: I2cTransport,
    state: Mutex<ChipState>,
}

#[derive(Default)]
struct ChipState {
    port_a: u8,
    port_b: u8,
    initialized: bool,
}

impl Chip {
    pub fn new(config: ChipConfig, transport: I2cTransport) -> Self {
        Self { config, transport, state: Mutex::new(ChipState::default()) }
    }

    pub fn width(&self) -> u8 {
        self.config.kind.width()
    }

    fn pin_to_port(&self, pin: u8) -> Result<(Port, u8), IoError> {
        let width = self.width();
        if pin >= width {
            return Err(IoError::InvalidPin { pin, width });
        }
        match self.config.kind {
            ChipKind::Mcp23008 => Ok((Port::A, 1 << pin)),
            ChipKind::Mcp23017 => {
                if pin < 8 {
                    Ok((Port::A, 1 << pin))
                } else {
                    Ok((Port::B, 1 << (pin - 8)))
                }
            }
        }
    }

    /// Runs the chip init protocol (spec §4.2), in order: all pins input,
    /// optional pull-ups, optional polarity inversion, optional sequential
    /// IOCON, optional change-interrupt enable. Idempotent.
    pub async fn initialize(&self) -> Result<(), IoError> {
        let mut state = self.state.lock().await;
        if state.initialized {
            return Ok(());
        }
        let regs = self.config.kind.registers();

        self.transport.write_byte(regs.iodir_a, 0xFF).await.map_err(hw_err)?;
        if let Some(iodir_b) = regs.iodir_b {
            self.transport.write_byte(iodir_b, 0xFF).await.map_err(hw_err)?;
        }

        if self.config.pull_ups {
            self.transport.write_byte(regs.gppu_a, 0xFF).await.map_err(hw_err)?;
            if let Some(gppu_b) = regs.gppu_b {
                self.transport.write_byte(gppu_b, 0xFF).await.map_err(hw_err)?;
            }
        }

        if self.config.polarity_inversion {
            self.transport.write_byte(regs.ipol_a, 0xFF).await.map_err(hw_err)?;
            if let Some(ipol_b) = regs.ipol_b {
                self.transport.write_byte(ipol_b, 0xFF).await.map_err(hw_err)?;
            }
        }

        if self.config.sequential_operation {
            self.transport
                .write_byte(regs.iocon_a, IOCON_SEQUENTIAL_BIT)
                .await
                .map_err(hw_err)?;
            if let Some(iocon_b) = regs.iocon_b {
                self.transport
                    .write_byte(iocon_b, IOCON_SEQUENTIAL_BIT)
                    .await
                    .map_err(hw_err)?;
            }
        }

        if self.config.interrupt_pin.is_some() {
            self.transport.write_byte(regs.gpinten_a, 0xFF).await.map_err(hw_err)?;
            self.transport.write_byte(regs.intcon_a, 0x00).await.map_err(hw_err)?;
            if let Some(gpinten_b) = regs.gpinten_b {
                self.transport.write_byte(gpinten_b, 0xFF).await.map_err(hw_err)?;
            }
            if let Some(intcon_b) = regs.intcon_b {
                self.transport.write_byte(intcon_b, 0x00).await.map_err(hw_err)?;
            }
        }

        state.initialized = true;
        Ok(())
    }

    /// Sets direction (and, for inputs, pull-up) for one pin. Reads the
    /// current IODIR/GPPU byte before modifying it, since those registers
    /// aren't cached.
    pub async fn configure_pin(&self, pin: u8, output: bool, pull_up: bool) -> Result<(), IoError> {
        let (port, mask) = self.pin_to_port(pin)?;
        let _state = self.state.lock().await;
        let regs = self.config.kind.registers();
        let (iodir_reg, gppu_reg) = match port {
            Port::A => (regs.iodir_a, regs.gppu_a),
            Port::B => (regs.iodir_b.unwrap(), regs.gppu_b.unwrap()),
        };

        let iodir = self.transport.read_byte(iodir_reg).await.map_err(hw_err)?;
        let iodir = if output { iodir & !mask } else { iodir | mask };
        self.transport.write_byte(iodir_reg, iodir).await.map_err(hw_err)?;

        if !output {
            let gppu = self.transport.read_byte(gppu_reg).await.map_err(hw_err)?;
            let gppu = if pull_up { gppu | mask } else { gppu & !mask };
            self.transport.write_byte(gppu_reg, gppu).await.map_err(hw_err)?;
        }
        Ok(())
    }

    /// Refreshes the cached port bytes from hardware. Uses one block
    /// transaction when `sequential_operation` is set and both banks
    /// exist, two independent byte reads otherwise.
    pub async fn read_ports(&self) -> Result<(u8, u8), IoError> {
        let regs = self.config.kind.registers();
        let mut state = self.state.lock().await;

        let (a, b) = match regs.gpio_b {
            Some(_) if self.config.sequential_operation => {
                let bytes = self.transport.read_block(regs.gpio_a, 2).await.map_err(hw_err)?;
                (bytes[0], bytes[1])
            }
            Some(gpio_b) => {
                let a = self.transport.read_byte(regs.gpio_a).await.map_err(hw_err)?;
                let b = self.transport.read_byte(gpio_b).await.map_err(hw_err)?;
                (a, b)
            }
            None => {
                let a = self.transport.read_byte(regs.gpio_a).await.map_err(hw_err)?;
                (a, 0)
            }
        };

        state.port_a = a;
        state.port_b = b;
        Ok((a, b))
    }

    /// Writes a whole port byte and updates the cache.
    pub async fn write_port(&self, port: Port, value: u8) -> Result<(), IoError> {
        let regs = self.config.kind.registers();
        let mut state = self.state.lock().await;
        let register = match port {
            Port::A => regs.gpio_a,
            Port::B => regs.gpio_b.ok_or(IoError::InvalidPin { pin: 8, width: self.width() })?,
        };
        self.transport.write_byte(register, value).await.map_err(hw_err)?;
        match port {
            Port::A => state.port_a = value,
            Port::B => state.port_b = value,
        }
        Ok(())
    }

    /// Reads a pin from the cached port state — no bus round trip.
    pub async fn read_pin(&self, pin: u8) -> Result<bool, IoError> {
        let (port, mask) = self.pin_to_port(pin)?;
        let state = self.state.lock().await;
        let byte = match port {
            Port::A => state.port_a,
            Port::B => state.port_b,
        };
        Ok(byte & mask != 0)
    }

    /// Read-modify-write: flips one bit in the cached port byte, then
    /// writes the whole port out.
    pub async fn write_pin(&self, pin: u8, value: bool) -> Result<(), IoError> {
        let (port, mask) = self.pin_to_port(pin)?;
        let current = {
            let state = self.state.lock().await;
            match port {
                Port::A => state.port_a,
                Port::B => state.port_b,
            }
        };
        let updated = if value { current | mask } else { current & !mask };
        self.write_port(port, updated).await
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }
}
