//! Modbus RTU/TCP field-device polling library
//!
//! Adapters own one Modbus connection each and poll the devices behind it on
//! a fixed interval. Register words and bits are decoded into typed, scaled
//! values, cached per point and published to a [`host::DeviceHost`].

pub mod cli;
pub mod config;
pub mod devices;
pub mod host;
pub mod modbus;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::{GatewayConfig, AdapterSettings};
pub use devices::{ModbusDevice, Point, PointValue};
pub use host::{ConsoleHost, DeviceHost};
pub use modbus::{Encoding, ModbusClient, ModbusClientTrait, Transport};
pub use services::{Gateway, ModbusAdapter};
pub use utils::error::{CodecError, ConfigError, ModbusError, PollError, WriteError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
