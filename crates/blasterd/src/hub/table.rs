use std::collections::HashMap;

use super::DeviceInfo;

/// Lower-case, colon separated form of a MAC address.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase().replace('-', ":")
}

/// Devices currently reachable, keyed by normalized MAC.
#[derive(Debug, Default)]
pub struct DeviceTable {
    devices: HashMap<String, DeviceInfo>,
}

impl DeviceTable {
    /// Drop every known device and keep only `devices`.
    pub fn replace(&mut self, devices: impl IntoIterator<Item = DeviceInfo>) {
        self.devices = devices
            .into_iter()
            .map(|d| (normalize_mac(&d.mac), d))
            .collect();
    }

    pub fn insert(&mut self, device: DeviceInfo) {
        self.devices.insert(normalize_mac(&device.mac), device);
    }

    pub fn get(&self, mac: &str) -> Option<&DeviceInfo> {
        self.devices.get(&normalize_mac(mac))
    }

    pub fn contains(&self, mac: &str) -> bool {
        self.devices.contains_key(&normalize_mac(mac))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(mac: &str, ip: &str) -> DeviceInfo {
        DeviceInfo {
            mac: mac.to_string(),
            ip: ip.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac(" 34-EA-34-AA-BB-CC "), "34:ea:34:aa:bb:cc");
    }

    #[test]
    fn test_lookup_ignores_mac_format() {
        let mut table = DeviceTable::default();
        table.insert(info("34:EA:34:AA:BB:CC", "10.0.0.2"));

        assert!(table.contains("34-ea-34-aa-bb-cc"));
        assert_eq!(table.get("34:ea:34:aa:bb:cc").unwrap().ip, "10.0.0.2");
    }

    #[test]
    fn test_replace_drops_stale_devices() {
        let mut table = DeviceTable::default();
        table.insert(info("aa:aa:aa:aa:aa:aa", "10.0.0.2"));
        table.replace(vec![info("bb:bb:bb:bb:bb:bb", "10.0.0.3")]);

        assert_eq!(table.len(), 1);
        assert!(!table.contains("aa:aa:aa:aa:aa:aa"));
    }
}
