//! This crate provides an interface for monitoring and controlling Cryomech CPA1110 helium compressors.
//!
//! It reads the compressor's 33 input registers (operating state, warning and error bits, temperatures,
//! pressures, motor current, run hours, unit settings and identity) and can start or stop the compressor.
//!
//! It speaks Modbus under the hood, either Modbus TCP to the controller's Ethernet port or Modbus RTU
//! over RS232/RS485.
//!
//! The serial port used for compressor comms should be configured like so:
//! * Baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: Even
//!
//! The controller answers on device id 16 unless it has been reconfigured.
//!
//! ```no_run
//! use cpa1110::{config::CpaConfig, device::NetworkCpa1110};
//!
//! let mut cpa = NetworkCpa1110::open(&CpaConfig::tcp("192.168.1.20")).unwrap();
//! let snapshot = cpa.read_snapshot().unwrap();
//! println!("{:?} at {} h", snapshot.operating_state, snapshot.hours_of_operation);
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod link;
pub mod register;
pub mod transport;
pub mod types;

pub use config::{ConnectionType, CpaConfig};
pub use device::{Cpa1110, NetworkCpa1110, Session};
pub use error::{Error, ErrorKind};
pub use types::{CpaSnapshot, Errors, OperatingState, PressureUnits, TemperatureUnits, Warnings};

#[cfg(test)]
mod mock_link;
#[cfg(test)]
mod mock_transport;
