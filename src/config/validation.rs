use std::collections::HashSet;

use super::settings::{
    parse_point_address, parse_unit_address, DeviceConfig, GatewayConfig, RegisterConfig, RtuAdapterConfig,
    TcpAdapterConfig, MAX_POLL_INTERVAL_SECONDS,
};
use crate::modbus::codec::Divisor;
use crate::utils::error::ConfigError;

/// Problems found in one adapter entry. An entry with problems is not started.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterReport {
    pub field: String,
    pub id: Option<String>,
    pub errors: Vec<ConfigError>,
}

impl AdapterReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate(config: &GatewayConfig) -> Vec<AdapterReport> {
    let rtu = config
        .rtu_adapter
        .iter()
        .enumerate()
        .map(|(i, adapter)| validate_rtu_adapter(&format!("rtuAdapter[{}]", i), adapter));
    let tcp = config
        .tcp_adapter
        .iter()
        .enumerate()
        .map(|(i, adapter)| validate_tcp_adapter(&format!("tcpAdapter[{}]", i), adapter));
    rtu.chain(tcp).collect()
}

fn validate_rtu_adapter(field: &str, adapter: &RtuAdapterConfig) -> AdapterReport {
    let mut errors = Vec::new();
    if adapter.serial_port.trim().is_empty() {
        errors.push(ConfigError::MissingField {
            field: format!("{}.serialPort", field),
        });
    }
    if adapter.baud_rate == 0 {
        errors.push(ConfigError::MissingField {
            field: format!("{}.baudRate", field),
        });
    }
    validate_common(field, adapter.poll_interval, adapter.timeout_ms, &adapter.devices, &mut errors);

    AdapterReport {
        field: field.to_string(),
        id: adapter.id.clone(),
        errors,
    }
}

fn validate_tcp_adapter(field: &str, adapter: &TcpAdapterConfig) -> AdapterReport {
    let mut errors = Vec::new();
    if adapter.host.trim().is_empty() {
        errors.push(ConfigError::MissingField {
            field: format!("{}.host", field),
        });
    }
    if adapter.port == 0 {
        errors.push(ConfigError::MissingField {
            field: format!("{}.port", field),
        });
    }
    validate_common(field, adapter.poll_interval, adapter.timeout_ms, &adapter.devices, &mut errors);

    AdapterReport {
        field: field.to_string(),
        id: adapter.id.clone(),
        errors,
    }
}

fn validate_common(
    field: &str,
    poll_interval: Option<f64>,
    timeout_ms: Option<u64>,
    devices: &[DeviceConfig],
    errors: &mut Vec<ConfigError>,
) {
    if let Some(seconds) = poll_interval {
        if !seconds.is_finite() || !(0.0..=MAX_POLL_INTERVAL_SECONDS).contains(&seconds) {
            errors.push(ConfigError::Invalid {
                field: format!("{}.pollInterval", field),
                reason: format!(
                    "must be between 0 and {} seconds, got {}",
                    MAX_POLL_INTERVAL_SECONDS, seconds
                ),
            });
        }
    }
    if timeout_ms == Some(0) {
        errors.push(ConfigError::Invalid {
            field: format!("{}.timeoutMs", field),
            reason: "must be greater than zero".to_string(),
        });
    }
    for (i, device) in devices.iter().enumerate() {
        errors.extend(validate_device(&format!("{}.devices[{}]", field, i), device));
    }
}

/// Checks everything a device needs to be built, including unique point addresses.
pub fn validate_device(field: &str, device: &DeviceConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if let Err(e) = parse_unit_address(&format!("{}.address", field), &device.address) {
        errors.push(e);
    }

    let mut seen = HashSet::new();
    let bits = device
        .bits
        .iter()
        .enumerate()
        .map(|(i, bit)| (format!("{}.bits[{}]", field, i), &bit.address));
    let registers = device
        .registers
        .iter()
        .enumerate()
        .map(|(i, register)| (format!("{}.registers[{}]", field, i), &register.address));

    for (point_field, address) in bits.chain(registers) {
        let address_field = format!("{}.address", point_field);
        if let Err(e) = parse_point_address(&address_field, address) {
            errors.push(e);
        } else if !seen.insert(address.trim().to_string()) {
            errors.push(ConfigError::DuplicateAddress {
                field: address_field,
                address: address.clone(),
            });
        }
    }

    for (i, register) in device.registers.iter().enumerate() {
        errors.extend(validate_register(&format!("{}.registers[{}]", field, i), register));
    }

    errors
}

fn validate_register(field: &str, register: &RegisterConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if let Some(divisor) = register.divisor {
        if Divisor::new(divisor).is_err() {
            errors.push(ConfigError::InvalidDivisor {
                field: format!("{}.divisor", field),
                value: divisor,
            });
        }
    }
    if let (Some(minimum), Some(maximum)) = (register.minimum, register.maximum) {
        if minimum > maximum {
            errors.push(ConfigError::InvalidRange {
                field: field.to_string(),
                minimum,
                maximum,
            });
        }
    }

    errors
}
