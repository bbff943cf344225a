//! Stable identifiers for adapters, devices and points.
//!
//! Missing ids are generated once and written back to the configuration file
//! before anything is built from it, so identities survive restarts.

use log::info;
use std::path::Path;
use uuid::Uuid;

use super::settings::GatewayConfig;
use crate::utils::error::ConfigError;

/// Random 128-bit identifier, 32 lowercase hex characters.
pub fn generate_id() -> String {
    hex::encode(Uuid::new_v4().as_bytes())
}

fn fill(id: &mut Option<String>, generate: &mut impl FnMut() -> String, changed: &mut bool) {
    if id.as_deref().map_or(true, str::is_empty) {
        *id = Some(generate());
        *changed = true;
    }
}

/// Returns the configuration with every missing id filled in, and whether
/// anything had to be generated.
pub fn assign_missing_ids(mut config: GatewayConfig, mut generate: impl FnMut() -> String) -> (GatewayConfig, bool) {
    let mut changed = false;

    let rtu = config.rtu_adapter.iter_mut().map(|a| (&mut a.id, &mut a.devices));
    let tcp = config.tcp_adapter.iter_mut().map(|a| (&mut a.id, &mut a.devices));

    for (adapter_id, devices) in rtu.chain(tcp) {
        fill(adapter_id, &mut generate, &mut changed);
        for device in devices.iter_mut() {
            fill(&mut device.id, &mut generate, &mut changed);
            for bit in device.bits.iter_mut() {
                fill(&mut bit.id, &mut generate, &mut changed);
            }
            for register in device.registers.iter_mut() {
                fill(&mut register.id, &mut generate, &mut changed);
            }
        }
    }

    (config, changed)
}

/// Loads the configuration, back-fills ids and persists it if ids were added.
pub fn load_and_prepare<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, ConfigError> {
    let path = path.as_ref();
    let config = GatewayConfig::from_file(path)?;
    let (config, changed) = assign_missing_ids(config, generate_id);

    if changed {
        info!("🆔 Generated missing identifiers, persisting {}", path.display());
        config.save_to_file(path)?;
    }

    Ok(config)
}
