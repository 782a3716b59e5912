use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::control::Control;
use crate::control::ControlItem;
use crate::device::Command;
use crate::device::Device;
use crate::device::Scenario;
use crate::intent::Intent;

/// Root of the catalogue document.
///
/// Every map is ordered by key so that the file is written deterministically
/// and linear scans (intent matching) have a stable order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalogue {
    /// Devices keyed by MAC address.
    #[serde(default)]
    pub devices: BTreeMap<String, Device>,

    /// Voice-assistant intents keyed by intent name.
    #[serde(default)]
    pub intents: BTreeMap<String, Intent>,

    #[serde(default)]
    pub commands: BTreeMap<String, Command>,

    #[serde(default)]
    pub scenarios: BTreeMap<String, Scenario>,

    #[serde(default)]
    pub controls: BTreeMap<String, Control>,

    /// Schedule entries are not interpreted by blasterd, only preserved.
    #[serde(default)]
    pub schedule: BTreeMap<String, serde_json::Value>,
}

impl Catalogue {
    /// Find a device by its catalogue key (MAC), falling back to the vendor id.
    ///
    /// Returns the catalogue key together with the device.
    pub fn find_device(&self, device_id: &str) -> Option<(&str, &Device)> {
        if let Some((key, device)) = self.devices.get_key_value(device_id) {
            return Some((key.as_str(), device));
        }

        self.devices
            .iter()
            .find(|(key, device)| {
                key.eq_ignore_ascii_case(device_id) || (!device.id.is_empty() && device.id == device_id)
            })
            .map(|(key, device)| (key.as_str(), device))
    }

    /// Find a device by MAC, comparing case-insensitively against the stored MAC.
    pub fn find_device_by_mac(&self, mac: &str) -> Option<(&str, &Device)> {
        self.devices
            .iter()
            .find(|(key, device)| key.eq_ignore_ascii_case(mac) || device.mac.eq_ignore_ascii_case(mac))
            .map(|(key, device)| (key.as_str(), device))
    }

    pub fn command(&self, id: &str) -> Option<&Command> {
        self.commands.get(id)
    }

    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    pub fn control_item(&self, control_id: &str, item_id: &str) -> Option<&ControlItem> {
        self.controls.get(control_id)?.item(item_id)
    }
}
