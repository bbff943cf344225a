pub mod identity;
pub mod settings;
pub mod validation;

pub use identity::{assign_missing_ids, generate_id, load_and_prepare};
pub use settings::{
    AdapterSettings, BitConfig, BitKind, DeviceConfig, GatewayConfig, ParityConfig, RegisterConfig, RegisterKind,
    RtuAdapterConfig, TcpAdapterConfig,
};
pub use validation::{validate, validate_device, AdapterReport};
