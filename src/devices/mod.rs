pub mod modbus_device;
pub mod point;
pub mod value;

pub use modbus_device::{DevicePollReport, ModbusDevice};
pub use point::{Access, Point, PointSource};
pub use value::{CachedValue, PointValue};
