use log::{debug, error, info};

use super::point::Point;
use super::value::PointValue;
use crate::config::settings::{parse_unit_address, DeviceConfig};
use crate::host::{DeviceDescriptor, DeviceHost, SCHEMA_CONTEXT};
use crate::modbus::transport::Transport;
use crate::utils::error::{ConfigError, ModbusError, PollError, WriteError};

/// Outcome counts of one device poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevicePollReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failures that were request timeouts.
    pub timeouts: usize,
    pub connection_lost: bool,
}

/// A unit on the bus and the points configured for it.
pub struct ModbusDevice {
    id: String,
    name: String,
    unit_address: u8,
    points: Vec<Point>,
}

impl ModbusDevice {
    /// Builds every point, then announces the device and its properties to the host.
    ///
    /// Nothing is registered when any point fails to build.
    pub fn new(field: &str, config: &DeviceConfig, adapter_id: &str, host: &dyn DeviceHost) -> Result<Self, ConfigError> {
        let id = config
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: format!("{}.id", field),
            })?;
        let unit_address = parse_unit_address(&format!("{}.address", field), &config.address)?;

        let mut points = Vec::with_capacity(config.bits.len() + config.registers.len());
        for (i, bit) in config.bits.iter().enumerate() {
            points.push(Point::from_bit(&format!("{}.bits[{}]", field, i), bit)?);
        }
        for (i, register) in config.registers.iter().enumerate() {
            points.push(Point::from_register(&format!("{}.registers[{}]", field, i), register)?);
        }

        let device = Self {
            id,
            name: config.name.clone(),
            unit_address,
            points,
        };

        host.register_device(
            adapter_id,
            &DeviceDescriptor {
                context: SCHEMA_CONTEXT.to_string(),
                capabilities: config.capabilities.clone(),
                id: device.id.clone(),
                title: device.name.clone(),
                unit_address,
            },
        );
        for point in &device.points {
            host.register_property(&device.id, point.descriptor());
        }

        info!(
            "📟 Device {} ({}) at unit {:#04x} with {} points",
            device.name,
            device.id,
            unit_address,
            device.points.len()
        );
        Ok(device)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_address(&self) -> u8 {
        self.unit_address
    }

    /// Points in declaration order, bits first.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, address: &str) -> Option<&Point> {
        let address = address.trim();
        self.points.iter().find(|p| p.key() == address)
    }

    /// Polls every point once, in order. A failing point never stops the rest.
    ///
    /// When the connection itself is lost the transport is detached so the
    /// remaining points fail fast and the adapter reconnects.
    pub async fn poll(&self, transport: &Transport, host: &dyn DeviceHost) -> DevicePollReport {
        let mut report = DevicePollReport::default();

        for point in &self.points {
            match point.poll(transport, self.unit_address, &self.id, host).await {
                Ok(Some(_)) => report.updated += 1,
                Ok(None) => report.skipped += 1,
                Err(PollError::Transport(ModbusError::NotConnected)) => {
                    debug!("⏭️  {} [{}] skipped, transport not connected", self.name, point.key());
                    report.failed += 1;
                    report.connection_lost = true;
                }
                Err(e) => {
                    error!("❌ Failed to poll {} [{}]: {}", self.name, point.key(), e);
                    report.failed += 1;
                    if e == PollError::Transport(ModbusError::Timeout) {
                        report.timeouts += 1;
                    }
                    if e.is_connection_lost() && !report.connection_lost {
                        report.connection_lost = true;
                        transport.detach().await;
                    }
                }
            }
        }

        report
    }

    pub async fn write(&self, transport: &Transport, address: &str, value: PointValue) -> Result<(), WriteError> {
        let point = self
            .point(address)
            .ok_or_else(|| WriteError::PointNotFound(format!("{}/{}", self.id, address)))?;
        point.write(transport, self.unit_address, value).await
    }
}
