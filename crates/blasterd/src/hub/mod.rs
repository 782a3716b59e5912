//! Hardware adapter for the remote-control hubs on the network.
//!
//! blasterd never speaks the vendor wire protocol itself. A [`Hub`] wraps
//! whatever does (the vendor bridge process in production, a mock in tests)
//! and keeps the live table of devices reachable on the network.

mod bridge;
#[cfg(test)]
pub mod mock;
mod protocol;
mod table;

use std::time::Duration;

use async_trait::async_trait;
pub use bridge::BridgeHub;
use serde::Deserialize;
use serde::Serialize;
pub use table::normalize_mac;
pub use table::DeviceTable;

/// Network identity of a device as reported by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub ip: String,
    pub mac: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub device_type: String,
}

impl From<&blasterd_catalogue::Device> for DeviceInfo {
    fn from(device: &blasterd_catalogue::Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            ip: device.ip.clone(),
            mac: device.mac.clone(),
            key: device.key.clone(),
            device_type: device.device_type.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Device {0} is not known to the hub")]
    UnknownDevice(String),

    #[error("Bridge reported an error: {0}")]
    Bridge(String),

    #[error("Bridge did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Bridge process is not running")]
    Closed,

    #[error("Unexpected reply from bridge: {0}")]
    UnexpectedReply(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the execution engine needs from the hardware.
///
/// Implementations do their own transport timeouts. Callers serialize access
/// through the engine's hardware lock.
#[async_trait]
pub trait Hub: Send + Sync {
    /// Scan the network and replace the live device table with what answered.
    async fn discover(&self) -> Result<Vec<DeviceInfo>, HubError>;

    /// Replay `code` on the device with the given MAC.
    async fn execute(&self, mac: &str, code: &str) -> Result<(), HubError>;

    /// Current network identity of a device in the live table.
    async fn device_info(&self, mac: &str) -> Result<DeviceInfo, HubError>;

    /// Register a device from the catalogue without discovering it.
    async fn add_manual_device(&self, device: DeviceInfo) -> Result<(), HubError>;

    /// Power state of a smart plug.
    async fn power_state(&self, mac: &str) -> Result<bool, HubError>;

    /// Release whatever the hub holds on to (processes, sockets).
    async fn shutdown(&self) {}
}
