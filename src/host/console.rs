use chrono::Utc;
use log::{debug, info};
use serde_json::json;

use super::{AdapterDescriptor, DeviceDescriptor, DeviceHost, PropertyDescriptor};
use crate::devices::value::PointValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFormat {
    Text,
    Json,
}

impl HostFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(HostFormat::Text),
            "json" => Some(HostFormat::Json),
            _ => None,
        }
    }
}

/// Host that prints every published value to stdout.
pub struct ConsoleHost {
    format: HostFormat,
}

impl ConsoleHost {
    pub fn new(format: HostFormat) -> Self {
        Self { format }
    }

    pub fn format_value(&self, device_id: &str, property: &PropertyDescriptor, value: &PointValue) -> String {
        match self.format {
            HostFormat::Text => {
                let unit = property.unit.as_deref().map(|u| format!(" {}", u)).unwrap_or_default();
                format!("{} | {} [{}] = {}{}", device_id, property.title, property.name, value, unit)
            }
            HostFormat::Json => json!({
                "timestamp": Utc::now().to_rfc3339(),
                "device": device_id,
                "property": property.name,
                "title": property.title,
                "value": value,
                "unit": property.unit,
            })
            .to_string(),
        }
    }
}

impl DeviceHost for ConsoleHost {
    fn register_adapter(&self, adapter: &AdapterDescriptor) {
        info!("📡 Adapter added: {} [{}]", adapter.name, adapter.id);
    }

    fn register_device(&self, adapter_id: &str, device: &DeviceDescriptor) {
        info!(
            "📋 Device added: '{}' [{}] at unit {} on adapter {}",
            device.title, device.id, device.unit_address, adapter_id
        );
    }

    fn register_property(&self, device_id: &str, property: &PropertyDescriptor) {
        debug!(
            "➕ Property added to {}: {} ({}, {}{})",
            device_id,
            property.name,
            property.title,
            property.value_type,
            if property.read_only { ", read-only" } else { "" }
        );
    }

    fn publish_value(&self, device_id: &str, property: &PropertyDescriptor, value: &PointValue) {
        println!("{}", self.format_value(device_id, property, value));
    }
}
