use async_trait::async_trait;
use log::{error, info};
use std::fmt;
use std::time::Duration;
use tokio_modbus::client::{rtu, tcp, Context};
use tokio_modbus::prelude::*;
use tokio_serial::SerialStream;

use crate::config::settings::ParityConfig;
use crate::utils::error::ModbusError;

/// Request primitives of one Modbus connection.
///
/// The unit address is connection state: it applies to every request issued
/// after `set_unit_address` until it is changed again, so callers must select
/// it and issue the request without releasing the connection in between.
#[async_trait]
pub trait ModbusClientTrait: Send {
    fn set_unit_address(&mut self, unit: u8);

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModbusError>;

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModbusError>;

    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ModbusError>;

    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModbusError>;

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModbusError>;

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), ModbusError>;
}

/// Opens (and re-opens) the connection of one adapter.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ModbusClientTrait>, ModbusError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportSettings {
    Rtu {
        serial_port: String,
        baud_rate: u32,
        parity: ParityConfig,
    },
    Tcp {
        host: String,
        port: u16,
    },
}

impl fmt::Display for TransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSettings::Rtu { serial_port, baud_rate, .. } => write!(f, "{} @ {} baud", serial_port, baud_rate),
            TransportSettings::Tcp { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

pub struct ModbusClient {
    ctx: Context,
    timeout: Duration,
}

impl ModbusClient {
    pub fn connect_serial(
        port_name: &str,
        baud_rate: u32,
        parity: &ParityConfig,
        timeout: Duration,
    ) -> Result<Self, ModbusError> {
        info!("🔌 Connecting to Modbus RTU port: {}", port_name);
        info!("⚙️  Configuration: {} baud, {:?} parity, 8 data bits, 1 stop bit", baud_rate, parity);

        let serial_parity = match parity {
            ParityConfig::None => tokio_serial::Parity::None,
            ParityConfig::Even => tokio_serial::Parity::Even,
            ParityConfig::Odd => tokio_serial::Parity::Odd,
        };

        let builder = tokio_serial::new(port_name, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(serial_parity);

        let port = SerialStream::open(&builder).map_err(|e| {
            error!("❌ Failed to open serial port {}: {}", port_name, e);
            ModbusError::ConnectionError(format!("Failed to open port: {}", e))
        })?;

        info!("✅ Modbus RTU connection established on {}", port_name);
        Ok(Self {
            ctx: rtu::attach_slave(port, Slave(0)),
            timeout,
        })
    }

    pub async fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<Self, ModbusError> {
        info!("🔌 Connecting to Modbus TCP endpoint: {}:{}", host, port);

        let socket_addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ModbusError::ConnectionError(format!("Failed to resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| ModbusError::ConnectionError(format!("No address found for {}", host)))?;

        let ctx = tokio::time::timeout(timeout, tcp::connect(socket_addr))
            .await?
            .map_err(|e| {
                error!("❌ Failed to connect to {}: {}", socket_addr, e);
                ModbusError::ConnectionError(format!("Failed to connect to {}: {}", socket_addr, e))
            })?;

        info!("✅ Modbus TCP connection established with {}", socket_addr);
        Ok(Self { ctx, timeout })
    }
}

fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T, ModbusError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(ModbusError::Exception(format!("{:?}", exception))),
        Err(tokio_modbus::Error::Transport(err)) => Err(err.into()),
        Err(err) => Err(ModbusError::CommunicationError(err.to_string())),
    }
}

#[async_trait]
impl ModbusClientTrait for ModbusClient {
    fn set_unit_address(&mut self, unit: u8) {
        self.ctx.set_slave(Slave(unit));
    }

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModbusError> {
        let timeout = self.timeout;
        flatten(tokio::time::timeout(timeout, self.ctx.read_discrete_inputs(address, count)).await?)
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModbusError> {
        let timeout = self.timeout;
        flatten(tokio::time::timeout(timeout, self.ctx.read_coils(address, count)).await?)
    }

    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ModbusError> {
        let timeout = self.timeout;
        flatten(tokio::time::timeout(timeout, self.ctx.write_single_coil(address, value)).await?)
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        let timeout = self.timeout;
        flatten(tokio::time::timeout(timeout, self.ctx.read_input_registers(address, count)).await?)
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        let timeout = self.timeout;
        flatten(tokio::time::timeout(timeout, self.ctx.read_holding_registers(address, count)).await?)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), ModbusError> {
        let timeout = self.timeout;
        flatten(tokio::time::timeout(timeout, self.ctx.write_single_register(address, value)).await?)
    }
}

/// Connector backed by `tokio-modbus`.
pub struct ModbusConnector {
    settings: TransportSettings,
    timeout: Duration,
}

impl ModbusConnector {
    pub fn new(settings: TransportSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }
}

#[async_trait]
impl Connector for ModbusConnector {
    async fn connect(&self) -> Result<Box<dyn ModbusClientTrait>, ModbusError> {
        let client = match &self.settings {
            TransportSettings::Rtu {
                serial_port,
                baud_rate,
                parity,
            } => ModbusClient::connect_serial(serial_port, *baud_rate, parity, self.timeout)?,
            TransportSettings::Tcp { host, port } => ModbusClient::connect_tcp(host, *port, self.timeout).await?,
        };
        Ok(Box::new(client))
    }

    fn describe(&self) -> String {
        self.settings.to_string()
    }
}
