use serde::Deserialize;
use serde::Serialize;
use strum::Display;

use crate::intent::CommandIntent;

/// What kind of hardware a device is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceCategory {
    /// Smart plug or relay that reports an on/off power state.
    PowerSwitch,
    /// IR/RF blaster replaying learned codes.
    #[default]
    Blaster,
}

/// A remote-control device on the local network.
///
/// Devices are keyed by MAC address in the catalogue. The network identity
/// (ip, key, id, device type) is refreshed after every successful execution
/// since DHCP leases and device replacements make it drift.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub ip: String,
    pub mac: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub category: DeviceCategory,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Device {
    /// Whether the device can report its power state.
    pub fn supports_power_state(&self) -> bool {
        self.category == DeviceCategory::PowerSwitch
    }
}

/// A learned IR/RF signal bound to a device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    /// Catalogue key (MAC) of the device that replays this command.
    pub device_id: String,
    pub name: String,
    /// Vendor payload, hex encoded.
    pub code: String,
    #[serde(default)]
    pub intents: Vec<CommandIntent>,
}

/// One step of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceItem {
    pub command_id: String,
    /// Seconds to wait after the command succeeded.
    #[serde(default)]
    pub delay: u64,
}

/// An ordered list of commands with delays between them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sequence: Vec<SequenceItem>,
    #[serde(default)]
    pub intents: Vec<CommandIntent>,
}
