use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use iocontrol_metrics::{Operation, PerformanceMonitor};
use iocontrol_types::{Backend, IoError, IoPoint, Value};
use tokio::sync::Mutex;

use crate::chip::Chip;

/// Backend for one or more MCP23017/MCP23008 expanders on the same or
/// different I2C buses. The caller provides the chip list separately from
/// the point list (spec §6): `ExpanderBackend` only routes points to
/// already-constructed chips via `HardwareRef::parse_expander`.
pub struct ExpanderBackend {
    name: String,
    chips: HashMap<u8, Arc<Chip>>,
    points: Mutex<HashMap<String, (Arc<Chip>, u8)>>,
    metrics: Arc<PerformanceMonitor>,
}

impl ExpanderBackend {
    pub fn new(name: impl Into<String>, chips: Vec<Arc<Chip>>, metrics: Arc<PerformanceMonitor>) -> Self {
        Self {
            name: name.into(),
            chips: chips.into_iter().map(|chip| (chip.config.address, chip)).collect(),
            points: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    async fn record<T>(
        &self,
        operation: Operation,
        start: Instant,
        result: Result<T, IoError>,
    ) -> Result<T, IoError> {
        self.metrics
            .record_operation(&self.name, operation, start.elapsed(), result.is_err())
            .await;
        result
    }
}

#[async_trait]
impl Backend for ExpanderBackend {
    async fn initialize(&self, points: &[IoPoint]) -> Result<(), IoError> {
        let mut owned = HashMap::new();
        for point in points {
            if point.hardware_ref.backend_kind() != iocontrol_types::BackendKind::Expander {
                continue;
            }
            let (address, pin) = point.hardware_ref.parse_expander()?;
            let chip = self
                .chips
                .get(&address)
                .ok_or_else(|| IoError::BackendUnavailable(point.hardware_ref.to_string()))?
                .clone();
            owned.insert(point.name.clone(), (chip, pin));
        }

        for (chip, _pin) in owned.values() {
            chip.initialize().await?;
        }
        for point in points {
            if let Some((chip, pin)) = owned.get(&point.name) {
                chip.configure_pin(*pin, point.io_type.is_output(), point.pull_up).await?;
            }
        }

        *self.points.lock().await = owned;
        Ok(())
    }

    async fn read_all(&self) -> Result<HashMap<String, Value>, IoError> {
        let start = Instant::now();
        let points = self.points.lock().await;

        let mut distinct: HashMap<u8, Arc<Chip>> = HashMap::new();
        for (chip, _) in points.values() {
            distinct.entry(chip.config.address).or_insert_with(|| chip.clone());
        }
        for chip in distinct.values() {
            chip.read_ports().await?;
        }

        let mut out = HashMap::new();
        for (name, (chip, pin)) in points.iter() {
            let bit = chip.read_pin(*pin).await?;
            out.insert(name.clone(), Value::Digital(bit));
        }
        self.record(Operation::Read, start, Ok(out)).await
    }

    async fn write_point(&self, name: &str, value: Value) -> Result<(), IoError> {
        let start = Instant::now();
        let points = self.points.lock().await;
        let (chip, pin) = points
            .get(name)
            .ok_or_else(|| IoError::UnknownPoint(name.to_string()))?;
        let bit = value
            .as_digital()
            .ok_or_else(|| IoError::Hardware(format!("{name} is a digital expander pin; got analog value")))?;
        let result = chip.write_pin(*pin, bit).await;
        self.record(Operation::Write, start, result).await
    }

    async fn close(&self) {
        let mut seen = std::collections::HashSet::new();
        for (chip, _) in self.points.lock().await.values() {
            if seen.insert(chip.config.address) {
                chip.close().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChipConfig, ChipKind};
    use iocontrol_transport::{I2cTransport, MemoryI2cBus};
    use iocontrol_types::{HardwareRef, IoType};

    fn point(name: &str, io_type: IoType, hw: &str, pull_up: bool) -> IoPoint {
        IoPoint {
            name: name.to_string(),
            io_type,
            hardware_ref: HardwareRef::new(hw),
            critical: false,
            interrupt_enabled: false,
            pull_up,
            initial_state: None,
            description: String::new(),
            tags: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn initialize_emits_exact_register_sequence_for_scenario_five() {
        use crate::registers::mcp23017::{GPPUA, GPPUB, IOCONA, IOCONB, IODIRA, IODIRB};

        let mut config = ChipConfig::new(0x20, ChipKind::Mcp23017);
        config.pull_ups = true;
        config.sequential_operation = true;
        let (bus, log) = MemoryI2cBus::with_log();
        let chip = Arc::new(Chip::new(config, I2cTransport::with_bus(Box::new(bus))));

        let backend = ExpanderBackend::new("expander", vec![chip.clone()], Arc::new(PerformanceMonitor::new()));
        let points = vec![point("relay_1", IoType::DigitalOutput, "mcp20_0", false)];
        backend.initialize(&points).await.unwrap();

        let writes: Vec<u8> = log.lock().unwrap().iter().map(|(reg, _)| *reg).collect();
        assert_eq!(writes, vec![IODIRA, IODIRB, GPPUA, GPPUB, IOCONA, IOCONB]);

        chip.close().await;
    }

    #[tokio::test]
    async fn write_pin_then_read_pin_round_trips_after_poll() {
        let config = ChipConfig::new(0x20, ChipKind::Mcp23008);
        let chip = Arc::new(Chip::new(config, I2cTransport::with_bus(Box::new(MemoryI2cBus::default()))));
        let backend = ExpanderBackend::new("expander", vec![chip.clone()], Arc::new(PerformanceMonitor::new()));

        let points = vec![point("relay_1", IoType::DigitalOutput, "mcp20_0", false)];
        backend.initialize(&points).await.unwrap();

        backend.write_point("relay_1", Value::Digital(true)).await.unwrap();
        backend.read_all().await.unwrap();
        let values = backend.read_all().await.unwrap();
        assert_eq!(values.get("relay_1"), Some(&Value::Digital(true)));

        backend.close().await;
    }

    #[tokio::test]
    async fn unknown_point_write_is_rejected() {
        let config = ChipConfig::new(0x20, ChipKind::Mcp23008);
        let chip = Arc::new(Chip::new(config, I2cTransport::with_bus(Box::new(MemoryI2cBus::default()))));
        let backend = ExpanderBackend::new("expander", vec![chip], Arc::new(PerformanceMonitor::new()));
        backend.initialize(&[]).await.unwrap();

        let err = backend.write_point("missing", Value::Digital(true)).await.unwrap_err();
        assert!(matches!(err, IoError::UnknownPoint(_)));
    }
}
