//! The device-management host this engine reports to.
//!
//! Adapters, devices and properties are announced once when they are built;
//! after that the host only receives freshly polled values.

pub mod console;
#[cfg(test)]
pub(crate) mod recording;

use serde::Serialize;

use crate::devices::value::PointValue;

pub use console::{ConsoleHost, HostFormat};

pub const SCHEMA_CONTEXT: &str = "https://iot.mozilla.org/schemas/";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterDescriptor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub capabilities: Vec<String>,
    pub id: String,
    pub title: String,
    pub unit_address: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Property name; the point's address string.
    pub name: String,
    pub id: String,
    pub title: String,
    /// `boolean`, `integer` or `number`.
    #[serde(rename = "type")]
    pub value_type: &'static str,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    pub read_only: bool,
}

pub trait DeviceHost: Send + Sync {
    fn register_adapter(&self, adapter: &AdapterDescriptor);

    fn register_device(&self, adapter_id: &str, device: &DeviceDescriptor);

    fn register_property(&self, device_id: &str, property: &PropertyDescriptor);

    fn publish_value(&self, device_id: &str, property: &PropertyDescriptor, value: &PointValue);
}
