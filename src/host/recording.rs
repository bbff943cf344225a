use std::sync::Mutex;

use super::{AdapterDescriptor, DeviceDescriptor, DeviceHost, PropertyDescriptor};
use crate::devices::value::PointValue;

/// Host that remembers everything it was told, for assertions.
#[derive(Default)]
pub struct RecordingHost {
    pub adapters: Mutex<Vec<AdapterDescriptor>>,
    pub devices: Mutex<Vec<(String, DeviceDescriptor)>>,
    pub properties: Mutex<Vec<(String, PropertyDescriptor)>>,
    pub published: Mutex<Vec<(String, String, PointValue)>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Published values as `(device id, property name, value)`.
    pub fn published(&self) -> Vec<(String, String, PointValue)> {
        self.published.lock().unwrap().clone()
    }
}

impl DeviceHost for RecordingHost {
    fn register_adapter(&self, adapter: &AdapterDescriptor) {
        self.adapters.lock().unwrap().push(adapter.clone());
    }

    fn register_device(&self, adapter_id: &str, device: &DeviceDescriptor) {
        self.devices.lock().unwrap().push((adapter_id.to_string(), device.clone()));
    }

    fn register_property(&self, device_id: &str, property: &PropertyDescriptor) {
        self.properties
            .lock()
            .unwrap()
            .push((device_id.to_string(), property.clone()));
    }

    fn publish_value(&self, device_id: &str, property: &PropertyDescriptor, value: &PointValue) {
        self.published
            .lock()
            .unwrap()
            .push((device_id.to_string(), property.name.clone(), *value));
    }
}
