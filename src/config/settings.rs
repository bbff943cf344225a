use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::modbus::client::TransportSettings;
use crate::modbus::codec::Encoding;
use crate::utils::error::ConfigError;

pub const DEFAULT_POLL_INTERVAL_SECONDS: f64 = 2.0;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
/// Longest accepted poll interval: one day.
pub const MAX_POLL_INTERVAL_SECONDS: f64 = 86_400.0;

/// Persisted configuration tree: every adapter of the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rtu_adapter: Vec<RtuAdapterConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tcp_adapter: Vec<TcpAdapterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtuAdapterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub serial_port: String,
    #[serde(default)]
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpAdapterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Unit address, hex.
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub bits: Vec<BitConfig>,
    #[serde(default)]
    pub registers: Vec<RegisterConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitKind {
    #[default]
    DiscreteInput,
    Coil,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "type")]
    pub kind: BitKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterKind {
    #[default]
    Input,
    Holding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "type")]
    pub kind: RegisterKind,
    #[serde(default = "default_encoding")]
    pub encoding: Encoding,
    /// Semantic type tag handed to the host, e.g. `TemperatureProperty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,
}

fn default_encoding() -> Encoding {
    Encoding::Int16
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            address: String::new(),
            kind: RegisterKind::default(),
            encoding: default_encoding(),
            property_type: None,
            unit: None,
            minimum: None,
            maximum: None,
            divisor: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityConfig {
    #[default]
    None,
    Even,
    Odd,
}

/// Runtime view of one adapter entry, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSettings {
    pub id: String,
    pub transport: TransportSettings,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub retry_delay: Duration,
    pub devices: Vec<DeviceConfig>,
}

impl AdapterSettings {
    pub fn name(&self) -> String {
        match &self.transport {
            TransportSettings::Rtu { serial_port, .. } => format!("Modbus RTU {}", serial_port),
            TransportSettings::Tcp { host, port } => format!("Modbus TCP {}:{}", host, port),
        }
    }
}

fn poll_interval(seconds: Option<f64>) -> Duration {
    let default = Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECONDS);
    // Zero and missing both fall back to the default, like an unset interval.
    match seconds {
        Some(s) if s.is_finite() && s > 0.0 => {
            Duration::try_from_secs_f64(s.min(MAX_POLL_INTERVAL_SECONDS)).unwrap_or(default)
        }
        _ => default,
    }
}

fn required_id(id: &Option<String>, field: String) -> Result<String, ConfigError> {
    match id {
        Some(id) if !id.is_empty() => Ok(id.clone()),
        _ => Err(ConfigError::MissingField { field }),
    }
}

impl RtuAdapterConfig {
    pub fn settings(&self, field: &str) -> Result<AdapterSettings, ConfigError> {
        Ok(AdapterSettings {
            id: required_id(&self.id, format!("{}.id", field))?,
            transport: TransportSettings::Rtu {
                serial_port: self.serial_port.clone(),
                baud_rate: self.baud_rate,
                parity: self.parity,
            },
            poll_interval: poll_interval(self.poll_interval),
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            retry_delay: Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)),
            devices: self.devices.clone(),
        })
    }
}

impl TcpAdapterConfig {
    pub fn settings(&self, field: &str) -> Result<AdapterSettings, ConfigError> {
        Ok(AdapterSettings {
            id: required_id(&self.id, format!("{}.id", field))?,
            transport: TransportSettings::Tcp {
                host: self.host.clone(),
                port: self.port,
            },
            poll_interval: poll_interval(self.poll_interval),
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            retry_delay: Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)),
            devices: self.devices.clone(),
        })
    }
}

/// Parses a hex unit address (`"0A"`, `"0x0a"`).
pub fn parse_unit_address(field: &str, value: &str) -> Result<u8, ConfigError> {
    parse_hex(field, value).and_then(|n| {
        u8::try_from(n).map_err(|_| ConfigError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        })
    })
}

/// Parses a hex point address (`"01"`, `"0x1F4"`).
pub fn parse_point_address(field: &str, value: &str) -> Result<u16, ConfigError> {
    parse_hex(field, value).and_then(|n| {
        u16::try_from(n).map_err(|_| ConfigError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        })
    })
}

fn parse_hex(field: &str, value: &str) -> Result<u32, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingField {
            field: field.to_string(),
        });
    }
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidAddress {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext.eq_ignore_ascii_case("toml")).unwrap_or(false)
}

impl GatewayConfig {
    /// Loads JSON, or TOML when the file has a `.toml` extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        info!("📄 Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        info!("💾 Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn adapter_count(&self) -> usize {
        self.rtu_adapter.len() + self.tcp_adapter.len()
    }

    /// Every adapter entry with its field path, RTU entries first.
    pub fn adapter_settings(&self) -> Vec<(String, Result<AdapterSettings, ConfigError>)> {
        let rtu = self.rtu_adapter.iter().enumerate().map(|(i, adapter)| {
            let field = format!("rtuAdapter[{}]", i);
            let settings = adapter.settings(&field);
            (field, settings)
        });
        let tcp = self.tcp_adapter.iter().enumerate().map(|(i, adapter)| {
            let field = format!("tcpAdapter[{}]", i);
            let settings = adapter.settings(&field);
            (field, settings)
        });
        rtu.chain(tcp).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "rtuAdapter": [{
            "id": "a1",
            "serialPort": "/dev/ttyUSB0",
            "baudRate": 9600,
            "pollInterval": 5,
            "devices": [{
                "id": "d1",
                "name": "Boiler",
                "address": "0A",
                "capabilities": ["TemperatureSensor"],
                "bits": [{"id": "b1", "name": "Pump", "address": "01", "type": "Coil"}],
                "registers": [{
                    "id": "r1",
                    "name": "Temperature",
                    "address": "1F4",
                    "type": "Holding",
                    "encoding": "Float32",
                    "propertyType": "TemperatureProperty",
                    "unit": "degree celsius",
                    "minimum": -20,
                    "maximum": 120,
                    "divisor": 10
                }]
            }]
        }],
        "tcpAdapter": [{"host": "10.0.0.5", "port": 502}]
    }"#;

    #[test]
    fn test_parse_json_layout() {
        let config: GatewayConfig = serde_json::from_str(SAMPLE).unwrap();

        let rtu = &config.rtu_adapter[0];
        assert_eq!(rtu.serial_port, "/dev/ttyUSB0");
        assert_eq!(rtu.parity, ParityConfig::None);
        let device = &rtu.devices[0];
        assert_eq!(device.bits[0].kind, BitKind::Coil);
        let register = &device.registers[0];
        assert_eq!(register.kind, RegisterKind::Holding);
        assert_eq!(register.encoding, Encoding::Float32);
        assert_eq!(register.divisor, Some(10.0));
        assert_eq!(register.property_type.as_deref(), Some("TemperatureProperty"));

        let tcp = &config.tcp_adapter[0];
        assert_eq!(tcp.id, None);
        assert!(tcp.devices.is_empty());
    }

    #[test]
    fn test_defaults_applied_to_settings() {
        let config: GatewayConfig = serde_json::from_str(SAMPLE).unwrap();
        let settings = config.rtu_adapter[0].settings("rtuAdapter[0]").unwrap();

        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(settings.name(), "Modbus RTU /dev/ttyUSB0");

        let mut zero = config.rtu_adapter[0].clone();
        zero.poll_interval = Some(0.0);
        assert_eq!(zero.settings("x").unwrap().poll_interval, Duration::from_secs(2));

        let mut huge = config.rtu_adapter[0].clone();
        huge.poll_interval = Some(1e20);
        assert_eq!(huge.settings("x").unwrap().poll_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn test_settings_require_id() {
        let config: GatewayConfig = serde_json::from_str(SAMPLE).unwrap();
        let entries = config.adapter_settings();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].1.is_ok());
        assert_eq!(
            entries[1].1,
            Err(ConfigError::MissingField {
                field: "tcpAdapter[0].id".to_string()
            })
        );
    }

    #[test]
    fn test_parse_hex_addresses() {
        assert_eq!(parse_unit_address("f", "0A").unwrap(), 10);
        assert_eq!(parse_unit_address("f", "0xff").unwrap(), 255);
        assert_eq!(parse_point_address("f", "1F4").unwrap(), 500);
        assert!(matches!(parse_unit_address("f", "100"), Err(ConfigError::InvalidAddress { .. })));
        assert!(matches!(parse_point_address("f", "zz"), Err(ConfigError::InvalidAddress { .. })));
        assert!(matches!(parse_point_address("f", " "), Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_json_and_toml_files_round_trip() {
        let config: GatewayConfig = serde_json::from_str(SAMPLE).unwrap();
        let dir = tempfile::tempdir().unwrap();

        for name in ["config.json", "config.toml"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).unwrap();
            assert_eq!(GatewayConfig::from_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(GatewayConfig::from_file(&path), Err(ConfigError::Parse(_))));
    }
}
