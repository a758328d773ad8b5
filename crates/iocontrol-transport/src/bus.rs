use crate::TransportError;

/// Raw, synchronous register access to one I2C device. Implementations run
/// exclusively on the transport's worker thread.
pub trait I2cBus: Send {
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), TransportError>;
    fn read_byte(&mut self, register: u8) -> Result<u8, TransportError>;
    fn write_block(&mut self, register: u8, values: &[u8]) -> Result<(), TransportError>;
    fn read_block(&mut self, register: u8, length: usize) -> Result<Vec<u8>, TransportError>;
}

/// Real Linux i2c-dev backed bus, using SMBus byte and block transactions.
pub struct LinuxI2cBus {
    device: i2cdev::linux::LinuxI2CDevice,
}

impl LinuxI2cBus {
    pub fn open(bus_number: u8, address: u8) -> Result<Self, TransportError> {
        let path = format!("/dev/i2c-{bus_number}");
        let device = i2cdev::linux::LinuxI2CDevice::new(path, address as u16)
            .map_err(|e| TransportError::Bus(e.to_string()))?;
        Ok(Self { device })
    }
}

impl I2cBus for LinuxI2cBus {
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        use i2cdev::core::I2CDevice;
        self.device
            .smbus_write_byte_data(register, value)
            .map_err(|e| TransportError::Bus(e.to_string()))
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, TransportError> {
        use i2cdev::core::I2CDevice;
        self.device
            .smbus_read_byte_data(register)
            .map_err(|e| TransportError::Bus(e.to_string()))
    }

    fn write_block(&mut self, register: u8, values: &[u8]) -> Result<(), TransportError> {
        use i2cdev::core::I2CDevice;
        self.device
            .smbus_write_i2c_block_data(register, values)
            .map_err(|e| TransportError::Bus(e.to_string()))
    }

    fn read_block(&mut self, register: u8, length: usize) -> Result<Vec<u8>, TransportError> {
        use i2cdev::core::I2CDevice;
        let bytes = self
            .device
            .smbus_read_i2c_block_data(register, length as u8)
            .map_err(|e| TransportError::Bus(e.to_string()))?;
        Ok(bytes)
    }
}

/// In-memory bus used for tests: `length` contiguous registers starting
/// at `register` so sequential reads/writes (e.g. the expander chip's
/// `GPIOA`/`GPIOB` pair) behave like real hardware would. Also records the
/// order of register writes for tests that assert on an exact init
/// sequence (spec §8 scenario 5). The log is reachable through a shared
/// handle since the bus itself moves onto the transport's worker thread.
#[derive(Default)]
pub struct MemoryI2cBus {
    registers: std::collections::HashMap<u8, u8>,
    log: Option<std::sync::Arc<std::sync::Mutex<Vec<(u8, u8)>>>>,
}

impl MemoryI2cBus {
    /// Builds a bus paired with a cloneable handle onto its write log, so
    /// callers can assert on the exact register-write sequence after the
    /// bus has been handed off to a transport's worker thread.
    pub fn with_log() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<(u8, u8)>>>) {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (Self { registers: Default::default(), log: Some(log.clone()) }, log)
    }
}

impl I2cBus for MemoryI2cBus {
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.registers.insert(register, value);
        if let Some(log) = &self.log {
            log.lock().unwrap().push((register, value));
        }
        Ok(())
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, TransportError> {
        Ok(*self.registers.get(&register).unwrap_or(&0))
    }

    fn write_block(&mut self, register: u8, values: &[u8]) -> Result<(), TransportError> {
        for (i, &value) in values.iter().enumerate() {
            let reg = register.wrapping_add(i as u8);
            self.registers.insert(reg, value);
            if let Some(log) = &self.log {
                log.lock().unwrap().push((reg, value));
            }
        }
        Ok(())
    }

    fn read_block(&mut self, register: u8, length: usize) -> Result<Vec<u8>, TransportError> {
        Ok((0..length)
            .map(|i| {
                let reg = register.wrapping_add(i as u8);
                *self.registers.get(&reg).unwrap_or(&0)
            })
            .collect())
    }
}
