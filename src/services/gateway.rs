use log::{error, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::adapter::{ModbusAdapter, SweepReport};
use crate::config::settings::{AdapterSettings, GatewayConfig};
use crate::config::validation::validate;
use crate::devices::PointValue;
use crate::host::DeviceHost;
use crate::modbus::client::{Connector, ModbusConnector};
use crate::utils::error::{ModbusError, WriteError};

/// Every valid adapter of one configuration.
pub struct Gateway {
    adapters: Vec<Arc<ModbusAdapter>>,
}

impl Gateway {
    /// Builds an adapter for each entry that passes validation; the rest are logged and skipped.
    pub fn from_config(config: &GatewayConfig, host: Arc<dyn DeviceHost>) -> Self {
        Self::with_connectors(config, host, |settings| -> Box<dyn Connector> {
            Box::new(ModbusConnector::new(settings.transport.clone(), settings.timeout))
        })
    }

    pub fn with_connectors<F>(config: &GatewayConfig, host: Arc<dyn DeviceHost>, connector: F) -> Self
    where
        F: Fn(&AdapterSettings) -> Box<dyn Connector>,
    {
        let reports = validate(config);
        let mut adapters = Vec::new();

        for ((field, settings), report) in config.adapter_settings().into_iter().zip(reports) {
            if !report.is_valid() {
                for e in &report.errors {
                    error!("❌ {}", e);
                }
                warn!("⏸️  Adapter {} not started: invalid configuration", field);
                continue;
            }
            match settings {
                Ok(settings) => {
                    let connector = connector(&settings);
                    adapters.push(Arc::new(ModbusAdapter::new(settings, connector, Arc::clone(&host))));
                }
                Err(e) => {
                    error!("❌ {}", e);
                    warn!("⏸️  Adapter {} not started: invalid configuration", field);
                }
            }
        }

        info!("🏭 {} of {} adapters configured", adapters.len(), config.adapter_count());
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Arc<ModbusAdapter>] {
        &self.adapters
    }

    /// Spawns the connect-and-poll loop of every adapter.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.adapters.iter().map(|a| Arc::clone(a).start()).collect()
    }

    /// Connects every adapter once, without retrying.
    pub async fn connect_all(&self) -> Vec<(String, Result<(), ModbusError>)> {
        let mut results = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            results.push((adapter.id().to_string(), adapter.connect().await));
        }
        results
    }

    /// One sweep on every connected adapter.
    pub async fn poll_once(&self) -> Vec<(String, SweepReport)> {
        let mut reports = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            if adapter.devices().is_empty() {
                continue;
            }
            reports.push((adapter.id().to_string(), adapter.poll().await));
        }
        reports
    }

    pub fn adapter_for_device(&self, device_id: &str) -> Option<&Arc<ModbusAdapter>> {
        self.adapters.iter().find(|a| a.device(device_id).is_some())
    }

    pub async fn write(&self, device_id: &str, address: &str, value: PointValue) -> Result<(), WriteError> {
        let adapter = self
            .adapter_for_device(device_id)
            .ok_or_else(|| WriteError::DeviceNotFound(device_id.to_string()))?;
        adapter.write(device_id, address, value).await
    }
}
