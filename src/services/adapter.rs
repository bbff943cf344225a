use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::config::settings::AdapterSettings;
use crate::devices::{ModbusDevice, PointValue};
use crate::host::{AdapterDescriptor, DeviceHost};
use crate::modbus::client::Connector;
use crate::modbus::transport::Transport;
use crate::utils::error::{ModbusError, WriteError};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
/// Consecutive sweeps that only timed out before the connection is dropped.
pub const TIMEOUT_SWEEPS_BEFORE_RECONNECT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Disconnected,
    Connecting,
    Connected,
}

/// Totals of one sweep over every device of an adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timeouts: usize,
    pub connection_lost: bool,
    /// Another sweep was still running; nothing was polled.
    pub in_progress: bool,
}

/// Doubling reconnect delay, capped at one minute.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        let initial = initial.min(MAX_RETRY_DELAY);
        Self {
            initial,
            current: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_RETRY_DELAY);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Releases the Idle/Polling flag when a sweep ends, even on cancellation.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One Modbus connection, the devices behind it and their poll schedule.
pub struct ModbusAdapter {
    settings: AdapterSettings,
    connector: Box<dyn Connector>,
    host: Arc<dyn DeviceHost>,
    transport: Transport,
    devices: OnceLock<Vec<ModbusDevice>>,
    state: Mutex<AdapterState>,
    polling: AtomicBool,
    timeout_sweeps: AtomicUsize,
}

impl ModbusAdapter {
    pub fn new(settings: AdapterSettings, connector: Box<dyn Connector>, host: Arc<dyn DeviceHost>) -> Self {
        host.register_adapter(&AdapterDescriptor {
            id: settings.id.clone(),
            name: settings.name(),
        });

        Self {
            settings,
            connector,
            host,
            transport: Transport::new(),
            devices: OnceLock::new(),
            state: Mutex::new(AdapterState::Disconnected),
            polling: AtomicBool::new(false),
            timeout_sweeps: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.settings.id
    }

    pub fn name(&self) -> String {
        self.settings.name()
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn state(&self) -> AdapterState {
        self.state.lock().map(|s| *s).unwrap_or(AdapterState::Disconnected)
    }

    fn set_state(&self, state: AdapterState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Devices in configuration order; empty until the first connect succeeds.
    pub fn devices(&self) -> &[ModbusDevice] {
        self.devices.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn device(&self, id: &str) -> Option<&ModbusDevice> {
        self.devices().iter().find(|d| d.id() == id)
    }

    /// Opens the connection. Devices are built after the first success only.
    pub async fn connect(&self) -> Result<(), ModbusError> {
        self.set_state(AdapterState::Connecting);
        info!("🔌 Connecting {} ({})", self.name(), self.connector.describe());

        match self.connector.connect().await {
            Ok(client) => {
                self.transport.attach(client).await;
                self.timeout_sweeps.store(0, Ordering::Relaxed);
                self.set_state(AdapterState::Connected);
                info!("✅ {} connected", self.name());
                self.devices.get_or_init(|| self.build_devices());
                Ok(())
            }
            Err(e) => {
                self.set_state(AdapterState::Disconnected);
                error!("❌ {} failed to connect: {}", self.name(), e);
                Err(e)
            }
        }
    }

    fn build_devices(&self) -> Vec<ModbusDevice> {
        let mut devices = Vec::with_capacity(self.settings.devices.len());
        for (i, config) in self.settings.devices.iter().enumerate() {
            let field = format!("{}.devices[{}]", self.settings.id, i);
            match ModbusDevice::new(&field, config, &self.settings.id, self.host.as_ref()) {
                Ok(device) => devices.push(device),
                Err(e) => error!("❌ Skipping device '{}': {}", config.name, e),
            }
        }
        devices
    }

    async fn connect_with_backoff(&self, backoff: &mut Backoff) {
        loop {
            match self.connect().await {
                Ok(()) => {
                    backoff.reset();
                    return;
                }
                Err(_) => {
                    let delay = backoff.next_delay();
                    warn!("⏳ Retrying {} in {:?}", self.name(), delay);
                    sleep(delay).await;
                }
            }
        }
    }

    /// Runs one sweep over all devices, in order.
    ///
    /// Returns immediately with `in_progress` set when a sweep is already running.
    pub async fn poll(&self) -> SweepReport {
        if self
            .polling
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("⏭️  {} sweep still running, skipping", self.name());
            return SweepReport {
                in_progress: true,
                ..SweepReport::default()
            };
        }
        let _guard = SweepGuard(&self.polling);

        let mut report = SweepReport::default();
        for device in self.devices() {
            let device_report = device.poll(&self.transport, self.host.as_ref()).await;
            report.updated += device_report.updated;
            report.skipped += device_report.skipped;
            report.failed += device_report.failed;
            report.timeouts += device_report.timeouts;
            if device_report.connection_lost {
                report.connection_lost = true;
                self.set_state(AdapterState::Disconnected);
                warn!("🔌 {} lost its connection", self.name());
                break;
            }
        }

        if !report.connection_lost {
            self.track_timeouts(&mut report).await;
        }

        info!(
            "🔄 {} sweep: {} updated, {} skipped, {} failed",
            self.name(),
            report.updated,
            report.skipped,
            report.failed
        );
        report
    }

    /// A peer that stopped answering never reports a broken connection, so
    /// sweeps where every request timed out are counted and the connection is
    /// dropped once they add up.
    async fn track_timeouts(&self, report: &mut SweepReport) {
        let silent = report.failed > 0
            && report.timeouts == report.failed
            && report.updated == 0
            && report.skipped == 0;
        if !silent {
            self.timeout_sweeps.store(0, Ordering::Relaxed);
            return;
        }

        let count = self.timeout_sweeps.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= TIMEOUT_SWEEPS_BEFORE_RECONNECT {
            warn!("🔌 {} timed out on {} sweeps in a row, reconnecting", self.name(), count);
            self.timeout_sweeps.store(0, Ordering::Relaxed);
            self.transport.detach().await;
            self.set_state(AdapterState::Disconnected);
            report.connection_lost = true;
        }
    }

    pub async fn write(&self, device_id: &str, address: &str, value: PointValue) -> Result<(), WriteError> {
        let device = self
            .device(device_id)
            .ok_or_else(|| WriteError::DeviceNotFound(device_id.to_string()))?;
        device.write(&self.transport, address, value).await
    }

    /// Connects (retrying with backoff) and then polls every interval, forever.
    pub async fn run(self: Arc<Self>) {
        let mut backoff = Backoff::new(self.settings.retry_delay);
        self.connect_with_backoff(&mut backoff).await;

        if self.devices().is_empty() {
            info!("📭 {} has no devices, polling not started", self.name());
            return;
        }

        let period = self.settings.poll_interval;
        info!("⏱️  {} polling every {:?}", self.name(), period);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.state() != AdapterState::Connected {
                self.connect_with_backoff(&mut backoff).await;
            }
            self.poll().await;
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
