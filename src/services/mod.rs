pub mod adapter;
pub mod gateway;

pub use adapter::{AdapterState, Backoff, ModbusAdapter, SweepReport};
pub use gateway::Gateway;
