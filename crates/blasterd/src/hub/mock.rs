//! Scriptable hub for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::DeviceInfo;
use super::DeviceTable;
use super::Hub;
use super::HubError;

/// A call made against the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubCall {
    Discover,
    Execute { mac: String, code: String },
    DeviceInfo { mac: String },
    AddManualDevice { mac: String },
    PowerState { mac: String },
}

#[derive(Debug, Default)]
struct MockState {
    /// Results handed out by `execute`, front first. Empty means success.
    execute_results: VecDeque<Result<(), String>>,
    /// What the next `discover` finds, or None to fail it.
    discovered: Option<Vec<DeviceInfo>>,
    table: DeviceTable,
    device_info_fails: bool,
    power: bool,
    calls: Vec<(Instant, HubCall)>,
}

/// Clones share state, so a test can keep one and hand another to the engine.
#[derive(Debug, Clone, Default)]
pub struct MockHub {
    state: Arc<Mutex<MockState>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put devices in the live table as if they had been discovered.
    pub fn with_devices(self, devices: Vec<DeviceInfo>) -> Self {
        self.state.lock().unwrap().table.replace(devices);
        self
    }

    /// Queue the outcome of the next `execute` calls.
    pub fn push_execute_result(&self, result: Result<(), String>) {
        self.state
            .lock()
            .unwrap()
            .execute_results
            .push_back(result);
    }

    pub fn set_discovered(&self, devices: Vec<DeviceInfo>) {
        self.state.lock().unwrap().discovered = Some(devices);
    }

    /// Make every later `device_info` call fail.
    pub fn fail_device_info(&self) {
        self.state.lock().unwrap().device_info_fails = true;
    }

    pub fn set_power(&self, on: bool) {
        self.state.lock().unwrap().power = on;
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Executed codes with the instant each was sent.
    pub fn executions(&self) -> Vec<(Instant, String)> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|(at, call)| match call {
                HubCall::Execute { code, .. } => Some((*at, code.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HubCall) {
        self.state.lock().unwrap().calls.push((Instant::now(), call));
    }
}

#[async_trait]
impl Hub for MockHub {
    async fn discover(&self) -> Result<Vec<DeviceInfo>, HubError> {
        self.record(HubCall::Discover);
        let mut state = self.state.lock().unwrap();
        match state.discovered.clone() {
            Some(devices) => {
                state.table.replace(devices.clone());
                Ok(devices)
            }
            None => Err(HubError::Bridge("no devices answered".to_string())),
        }
    }

    async fn execute(&self, mac: &str, code: &str) -> Result<(), HubError> {
        self.record(HubCall::Execute {
            mac: mac.to_string(),
            code: code.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        if !state.table.contains(mac) {
            return Err(HubError::UnknownDevice(mac.to_string()));
        }
        match state.execute_results.pop_front() {
            Some(Err(message)) => Err(HubError::Bridge(message)),
            _ => Ok(()),
        }
    }

    async fn device_info(&self, mac: &str) -> Result<DeviceInfo, HubError> {
        self.record(HubCall::DeviceInfo {
            mac: mac.to_string(),
        });
        let state = self.state.lock().unwrap();
        if state.device_info_fails {
            return Err(HubError::Bridge("device did not answer".to_string()));
        }
        state
            .table
            .get(mac)
            .cloned()
            .ok_or_else(|| HubError::UnknownDevice(mac.to_string()))
    }

    async fn add_manual_device(&self, device: DeviceInfo) -> Result<(), HubError> {
        self.record(HubCall::AddManualDevice {
            mac: device.mac.clone(),
        });
        self.state.lock().unwrap().table.insert(device);
        Ok(())
    }

    async fn power_state(&self, mac: &str) -> Result<bool, HubError> {
        self.record(HubCall::PowerState {
            mac: mac.to_string(),
        });
        Ok(self.state.lock().unwrap().power)
    }
}
