use blasterd_catalogue::Catalogue;
use blasterd_catalogue::Device;
use serde::Serialize;
use strum::Display;

use crate::hub::normalize_mac;
use crate::hub::DeviceInfo;

/// How a discovered device relates to the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiscoveryStatus {
    /// Not in the catalogue.
    New,
    /// In the catalogue with a different ip, key or type.
    Changed,
    /// In the catalogue and up to date.
    Configured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub status: DiscoveryStatus,
}

pub fn classify(catalogue: &Catalogue, info: &DeviceInfo) -> DiscoveryStatus {
    match catalogue.find_device_by_mac(&info.mac) {
        None => DiscoveryStatus::New,
        Some((_, device))
            if device.ip != info.ip
                || device.key != info.key
                || device.device_type != info.device_type =>
        {
            DiscoveryStatus::Changed
        }
        Some(_) => DiscoveryStatus::Configured,
    }
}

/// Catalogue key and entry for a discovered device.
///
/// Known devices keep their name, category and enabled flag; only the
/// network identity is taken from the discovery.
pub fn merge(catalogue: &Catalogue, info: &DeviceInfo) -> (String, Device) {
    match catalogue.find_device_by_mac(&info.mac) {
        Some((key, device)) => {
            let mut device = device.clone();
            apply_info(&mut device, info);
            (key.to_string(), device)
        }
        None => {
            let mac = normalize_mac(&info.mac);
            let name = if info.name.is_empty() {
                mac.clone()
            } else {
                info.name.clone()
            };
            let mut device = Device {
                name,
                enabled: true,
                ..Default::default()
            };
            apply_info(&mut device, info);
            device.mac = mac.clone();
            (mac, device)
        }
    }
}

/// Overwrite the network identity of `device` with what the hub reports.
pub fn apply_info(device: &mut Device, info: &DeviceInfo) {
    device.id = info.id.clone();
    device.ip = info.ip.clone();
    device.key = info.key.clone();
    device.device_type = info.device_type.clone();
    if !info.mac.is_empty() {
        device.mac = info.mac.clone();
    }
}
