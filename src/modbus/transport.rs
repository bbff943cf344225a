use tokio::sync::{Mutex, MutexGuard};

use super::client::ModbusClientTrait;
use crate::utils::error::ModbusError;

/// The single connection of an adapter.
///
/// Every request holds the lock from unit selection until the response
/// arrives, so at most one request is in flight per connection.
#[derive(Default)]
pub struct Transport {
    client: Mutex<Option<Box<dyn ModbusClientTrait>>>,
}

pub struct TransportGuard<'a> {
    client: MutexGuard<'a, Option<Box<dyn ModbusClientTrait>>>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Box<dyn ModbusClientTrait>) -> Self {
        Self {
            client: Mutex::new(Some(client)),
        }
    }

    pub async fn attach(&self, client: Box<dyn ModbusClientTrait>) {
        *self.client.lock().await = Some(client);
    }

    /// Drops the connection; requests fail with `NotConnected` until re-attached.
    pub async fn detach(&self) {
        self.client.lock().await.take();
    }

    pub async fn is_attached(&self) -> bool {
        self.client.lock().await.is_some()
    }

    pub async fn lock(&self) -> TransportGuard<'_> {
        TransportGuard {
            client: self.client.lock().await,
        }
    }
}

impl TransportGuard<'_> {
    /// Addresses `unit` and hands out the client for exactly the next request.
    pub fn select(&mut self, unit: u8) -> Result<&mut (dyn ModbusClientTrait + 'static), ModbusError> {
        let client = self.client.as_deref_mut().ok_or(ModbusError::NotConnected)?;
        client.set_unit_address(unit);
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::mock::{Call, MockTransport};

    #[tokio::test]
    async fn test_select_sets_unit_before_request() {
        let mock = MockTransport::new();
        let transport = Transport::with_client(Box::new(mock.client()));

        {
            let mut guard = transport.lock().await;
            guard.select(7).unwrap().write_coil(3, true).await.unwrap();
        }

        assert_eq!(
            mock.calls(),
            vec![Call::SetUnit(7), Call::WriteCoil { address: 3, value: true }]
        );
    }

    #[tokio::test]
    async fn test_detached_transport_is_not_connected() {
        let transport = Transport::new();
        assert!(!transport.is_attached().await);

        let mut guard = transport.lock().await;
        assert_eq!(guard.select(1).err(), Some(ModbusError::NotConnected));
    }
}
