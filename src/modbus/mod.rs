pub mod client;
pub mod codec;
#[cfg(test)]
pub(crate) mod mock;
pub mod transport;

pub use client::{Connector, ModbusClient, ModbusClientTrait, ModbusConnector, TransportSettings};
pub use codec::{decode, property_type, register_count, scale, Divisor, Encoding};
pub use transport::{Transport, TransportGuard};
