use std::sync::mpsc::Receiver;

use crate::{Command, I2cBus};

/// The bus's single dedicated worker. Runs on a plain OS thread so
/// blocking driver calls never stall the cooperative (tokio) runtime.
/// Exits as soon as the channel's last sender is dropped.
pub(crate) fn run(mut bus: Box<dyn I2cBus>, rx: Receiver<Command>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::WriteByte { register, value, reply } => {
                let _ = reply.send(bus.write_byte(register, value));
            }
            Command::ReadByte { register, reply } => {
                let _ = reply.send(bus.read_byte(register));
            }
            Command::WriteBlock { register, values, reply } => {
                let _ = reply.send(bus.write_block(register, &values));
            }
            Command::ReadBlock { register, length, reply } => {
                let _ = reply.send(bus.read_block(register, length));
            }
        }
    }
}
