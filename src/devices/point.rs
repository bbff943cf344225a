use chrono::Utc;
use log::{debug, warn};
use std::sync::Mutex;

use super::value::{CachedValue, PointValue};
use crate::config::settings::{parse_point_address, BitConfig, BitKind, RegisterConfig, RegisterKind};
use crate::host::{DeviceHost, PropertyDescriptor};
use crate::modbus::codec::{self, Divisor, Encoding};
use crate::modbus::transport::Transport;
use crate::utils::error::{ConfigError, PollError, WriteError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointSource {
    Bit(BitKind),
    Register {
        kind: RegisterKind,
        encoding: Encoding,
        divisor: Option<Divisor>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    Writable,
}

impl PointSource {
    pub fn access(&self) -> Access {
        match self {
            PointSource::Bit(BitKind::Coil) | PointSource::Register { kind: RegisterKind::Holding, .. } => {
                Access::Writable
            }
            PointSource::Bit(BitKind::DiscreteInput) | PointSource::Register { kind: RegisterKind::Input, .. } => {
                Access::ReadOnly
            }
        }
    }

    /// Number of bits or registers read per poll.
    pub fn count(&self) -> u16 {
        match self {
            PointSource::Bit(_) => 1,
            PointSource::Register { encoding, .. } => codec::register_count(*encoding),
        }
    }
}

/// One addressable bit or register of a device.
pub struct Point {
    address: u16,
    source: PointSource,
    descriptor: PropertyDescriptor,
    cache: Mutex<Option<CachedValue>>,
}

impl Point {
    pub fn from_bit(field: &str, config: &BitConfig) -> Result<Self, ConfigError> {
        let address = parse_point_address(&format!("{}.address", field), &config.address)?;
        let source = PointSource::Bit(config.kind);

        Ok(Self::new(
            address,
            source,
            PropertyDescriptor {
                name: config.address.trim().to_string(),
                id: config.id.clone().unwrap_or_default(),
                title: config.name.clone(),
                value_type: "boolean",
                semantic_type: None,
                unit: None,
                minimum: None,
                maximum: None,
                read_only: source.access() == Access::ReadOnly,
            },
        ))
    }

    pub fn from_register(field: &str, config: &RegisterConfig) -> Result<Self, ConfigError> {
        let address = parse_point_address(&format!("{}.address", field), &config.address)?;
        let divisor = config
            .divisor
            .map(|d| {
                Divisor::new(d).map_err(|_| ConfigError::InvalidDivisor {
                    field: format!("{}.divisor", field),
                    value: d,
                })
            })
            .transpose()?;
        let source = PointSource::Register {
            kind: config.kind,
            encoding: config.encoding,
            divisor,
        };

        Ok(Self::new(
            address,
            source,
            PropertyDescriptor {
                name: config.address.trim().to_string(),
                id: config.id.clone().unwrap_or_default(),
                title: config.name.clone(),
                value_type: codec::property_type(config.encoding),
                semantic_type: config.property_type.clone(),
                unit: config.unit.clone(),
                minimum: config.minimum,
                maximum: config.maximum,
                read_only: source.access() == Access::ReadOnly,
            },
        ))
    }

    fn new(address: u16, source: PointSource, descriptor: PropertyDescriptor) -> Self {
        Self {
            address,
            source,
            descriptor,
            cache: Mutex::new(None),
        }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// The configured address string, used as the property name.
    pub fn key(&self) -> &str {
        &self.descriptor.name
    }

    pub fn source(&self) -> PointSource {
        self.source
    }

    pub fn access(&self) -> Access {
        self.source.access()
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    pub fn cached(&self) -> Option<CachedValue> {
        self.cache.lock().ok().and_then(|cache| *cache)
    }

    pub fn cached_value(&self) -> Option<PointValue> {
        self.cached().map(|c| c.value)
    }

    /// Reads the point once and publishes the result.
    ///
    /// `Ok(None)` means the device answered without data; the cached value is
    /// left as it was.
    pub async fn poll(
        &self,
        transport: &Transport,
        unit: u8,
        device_id: &str,
        host: &dyn DeviceHost,
    ) -> Result<Option<PointValue>, PollError> {
        let count = self.source.count();

        let value = match self.source {
            PointSource::Bit(kind) => {
                let bits = {
                    let mut guard = transport.lock().await;
                    let client = guard.select(unit)?;
                    match kind {
                        BitKind::DiscreteInput => client.read_discrete_inputs(self.address, count).await?,
                        BitKind::Coil => client.read_coils(self.address, count).await?,
                    }
                };
                match self.usable(&bits) {
                    Some(bits) => PointValue::Boolean(bits[0]),
                    None => return Ok(None),
                }
            }
            PointSource::Register {
                kind,
                encoding,
                divisor,
            } => {
                let words = {
                    let mut guard = transport.lock().await;
                    let client = guard.select(unit)?;
                    match kind {
                        RegisterKind::Input => client.read_input_registers(self.address, count).await?,
                        RegisterKind::Holding => client.read_holding_registers(self.address, count).await?,
                    }
                };
                let words = match self.usable(&words) {
                    Some(words) => words,
                    None => return Ok(None),
                };
                let decoded = codec::decode(words, encoding)?;
                PointValue::from_register(encoding, codec::scale(decoded, divisor))
            }
        };

        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedValue {
                value,
                updated_at: Utc::now(),
            });
        }
        debug!("📊 {} [{}] = {}", self.descriptor.title, self.key(), value);
        host.publish_value(device_id, &self.descriptor, &value);

        Ok(Some(value))
    }

    /// Empty responses are skipped; oversized ones are cut to the expected length.
    fn usable<'a, T>(&self, data: &'a [T]) -> Option<&'a [T]> {
        let expected = self.source.count() as usize;
        if data.is_empty() {
            warn!("⚠️  No data returned for {} [{}], keeping previous value", self.descriptor.title, self.key());
            return None;
        }
        if data.len() > expected {
            warn!(
                "⚠️  Expected {} values for {} [{}], got {}; using the first",
                expected,
                self.descriptor.title,
                self.key(),
                data.len()
            );
            return Some(&data[..expected]);
        }
        Some(data)
    }

    /// Writes `value` to the device. The cache is refreshed by the next poll.
    pub async fn write(&self, transport: &Transport, unit: u8, value: PointValue) -> Result<(), WriteError> {
        match self.source {
            PointSource::Bit(BitKind::Coil) => {
                let state = value.as_bool().ok_or_else(|| self.invalid(value, "coils take a boolean"))?;
                let mut guard = transport.lock().await;
                guard.select(unit)?.write_coil(self.address, state).await?;
            }
            PointSource::Register {
                kind: RegisterKind::Holding,
                ..
            } => {
                let raw = self.raw_register(value)?;
                let mut guard = transport.lock().await;
                guard.select(unit)?.write_register(self.address, raw).await?;
            }
            _ => return Err(WriteError::ReadOnly(self.key().to_string())),
        }

        debug!("✏️  Wrote {} to {} [{}]", value, self.descriptor.title, self.key());
        Ok(())
    }

    fn raw_register(&self, value: PointValue) -> Result<u16, WriteError> {
        let n = match value {
            PointValue::Integer(n) => n,
            PointValue::Number(n) if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 => n as i64,
            _ => return Err(self.invalid(value, "holding registers take an integer")),
        };

        // Bounds describe the scaled reading, not the raw word.
        let divisor = match self.source {
            PointSource::Register { divisor, .. } => divisor,
            PointSource::Bit(_) => None,
        };
        let scaled = codec::scale(n as f64, divisor);

        if let Some(minimum) = self.descriptor.minimum {
            if scaled < minimum {
                return Err(self.invalid(value, &format!("below minimum {}", minimum)));
            }
        }
        if let Some(maximum) = self.descriptor.maximum {
            if scaled > maximum {
                return Err(self.invalid(value, &format!("above maximum {}", maximum)));
            }
        }

        match n {
            0..=65535 => Ok(n as u16),
            -32768..=-1 => Ok(n as i16 as u16),
            _ => Err(self.invalid(value, "does not fit a 16-bit register")),
        }
    }

    fn invalid(&self, value: PointValue, reason: &str) -> WriteError {
        WriteError::InvalidValue {
            address: self.key().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
