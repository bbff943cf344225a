pub mod error;

pub use error::{CodecError, ConfigError, ModbusError, PollError, WriteError};
