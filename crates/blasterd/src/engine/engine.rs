use std::sync::Arc;
use std::time::Duration;

use blasterd_catalogue::Command;
use blasterd_catalogue::Device;
use blasterd_catalogue::Entity;
use blasterd_catalogue::EntityKind;
use blasterd_catalogue::Scenario;
use blasterd_catalogue::Store;
use blasterd_catalogue::STATE_OFF;
use blasterd_catalogue::STATE_ON;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::discovery;
use super::discovery::DiscoveredDevice;
use super::error::ExecError;
use super::lock::HardwareLock;
use super::state::DeviceState;
use crate::hub::DeviceInfo;
use crate::hub::Hub;

/// Capacity of the device state broadcast buffer
/// Slow websocket subscribers lag and skip states rather than block the engine
const DEVICE_STATE_CHANNEL_SIZE: usize = 64;

/// blasterd engine
///
/// Resolves commands, scenarios and control items against the catalogue and
/// drives the hub. All hub I/O happens under the hardware lock; a second
/// caller is turned away with [`ExecError::Busy`] instead of queueing.
pub struct Engine {
    store: Arc<Store>,
    hub: Box<dyn Hub>,
    lock: HardwareLock,
    device_states: broadcast::Sender<DeviceState>,
}

impl Engine {
    pub fn new(store: Arc<Store>, hub: Box<dyn Hub>) -> Self {
        let (device_states, _) = broadcast::channel(DEVICE_STATE_CHANNEL_SIZE);
        Self {
            store,
            hub,
            lock: HardwareLock::new(),
            device_states,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn hardware_lock(&self) -> &HardwareLock {
        &self.lock
    }

    /// Receive power states published after switches are toggled.
    pub fn subscribe_device_states(&self) -> broadcast::Receiver<DeviceState> {
        self.device_states.subscribe()
    }

    /// Register every enabled catalogue device with the hub.
    ///
    /// Failures are logged; a device that could not be registered is picked
    /// up again by the next discovery.
    pub async fn init_devices(&self) -> Result<(), ExecError> {
        let devices: Vec<Device> = self.store.read(|c| c.devices.values().cloned().collect())?;

        for device in devices {
            if !device.enabled {
                info!("Device {} ({}) is disabled, skipping", device.name, device.mac);
                continue;
            }

            match self.hub.add_manual_device(DeviceInfo::from(&device)).await {
                Ok(()) => debug!("Registered device {} ({})", device.name, device.mac),
                Err(e) => warn!("Failed to register device {} ({}): {}", device.name, device.mac, e),
            }
        }

        Ok(())
    }

    /// Scan the network for devices and compare them with the catalogue.
    pub async fn discover(&self) -> Result<Vec<DiscoveredDevice>, ExecError> {
        let _guard = self.lock.guard().ok_or(ExecError::Busy)?;

        let devices = self.hub.discover().await.map_err(ExecError::Transport)?;
        let discovered = self.store.read(|c| {
            devices
                .into_iter()
                .map(|info| DiscoveredDevice {
                    status: discovery::classify(c, &info),
                    info,
                })
                .collect()
        })?;

        Ok(discovered)
    }

    /// Add or update discovered devices in the catalogue and save it.
    ///
    /// Returns the number of devices that were not in the catalogue before.
    pub fn add_discovered(&self, devices: &[DeviceInfo]) -> Result<usize, ExecError> {
        let mut added = 0;
        for info in devices {
            let (key, device) = self.store.read(|c| discovery::merge(c, info))?;
            if self.store.upsert_device(&key, device)? {
                info!("Added device {} to catalogue", key);
                added += 1;
            } else {
                info!("Updated device {} in catalogue", key);
            }
        }

        self.store.save()?;
        Ok(added)
    }

    /// Look up a command by id and run it.
    pub async fn exec_command(&self, command_id: &str) -> Result<(), ExecError> {
        let command = self.command(command_id)?;
        self.exec_command_full_cycle(&command).await
    }

    /// Look up a command by id.
    pub fn command(&self, command_id: &str) -> Result<Command, ExecError> {
        self.store
            .read(|c| c.command(command_id).cloned())?
            .ok_or_else(|| ExecError::CommandNotFound(command_id.to_string()))
    }

    /// Look up a scenario by id.
    pub fn scenario(&self, scenario_id: &str) -> Result<Scenario, ExecError> {
        self.store
            .read(|c| c.scenario(scenario_id).cloned())?
            .ok_or_else(|| ExecError::ScenarioNotFound(scenario_id.to_string()))
    }

    /// Send one command, rediscovering and retrying once on failure, then
    /// write the device's current network identity back to the catalogue.
    pub async fn exec_command_full_cycle(&self, command: &Command) -> Result<(), ExecError> {
        let (key, mut device) = self
            .store
            .read(|c| {
                c.find_device(&command.device_id)
                    .map(|(key, device)| (key.to_string(), device.clone()))
            })?
            .ok_or_else(|| ExecError::DeviceNotFound(command.device_id.clone()))?;

        let _guard = self.lock.guard().ok_or(ExecError::Busy)?;

        info!("Executing command {} on {} ({})", command.id, device.name, device.mac);
        self.send_with_retry(&device.mac, &command.code).await?;

        let info = self
            .hub
            .device_info(&device.mac)
            .await
            .map_err(ExecError::Transport)?;
        discovery::apply_info(&mut device, &info);
        self.store.replace_device(&key, device.clone())?;
        self.store.save()?;

        if device.supports_power_state() {
            self.publish_power_state(&key, &device).await;
        }

        Ok(())
    }

    async fn send_with_retry(&self, mac: &str, code: &str) -> Result<(), ExecError> {
        let first = match self.hub.execute(mac, code).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!("Execute on {} failed ({}), rediscovering and retrying", mac, first);
        self.hub.discover().await.map_err(ExecError::Transport)?;

        self.hub.execute(mac, code).await.map_err(|e| {
            error!("Retry on {} failed: {}", mac, e);
            ExecError::Transport(e)
        })
    }

    async fn publish_power_state(&self, key: &str, device: &Device) {
        match self.hub.power_state(&device.mac).await {
            Ok(on) => {
                let state = DeviceState {
                    id: key.to_string(),
                    state: if on { STATE_ON } else { STATE_OFF }.to_string(),
                };
                debug!("Device {} power state: {}", key, state.state);
                // No subscribers is fine
                let _ = self.device_states.send(state);
            }
            Err(e) => warn!("Failed to read power state of {}: {}", device.mac, e),
        }
    }

    /// Look up a scenario by id and run it.
    pub async fn exec_scenario_id(&self, scenario_id: &str) -> Result<(), ExecError> {
        let scenario = self.scenario(scenario_id)?;
        self.exec_scenario(&scenario).await
    }

    /// Run each step of a scenario in order, sleeping for the step's delay
    /// after it succeeded. Stops at the first failure.
    pub async fn exec_scenario(&self, scenario: &Scenario) -> Result<(), ExecError> {
        if scenario.sequence.is_empty() {
            return Err(ExecError::EmptyScenario(scenario.id.clone()));
        }

        info!("Running scenario {} ({} steps)", scenario.id, scenario.sequence.len());
        for (step, item) in scenario.sequence.iter().enumerate() {
            let command = self.command(&item.command_id)?;
            self.exec_command_full_cycle(&command).await?;

            if item.delay > 0 {
                debug!("Scenario {} step {}: waiting {}s", scenario.id, step, item.delay);
                tokio::time::sleep(Duration::from_secs(item.delay)).await;
            }
        }

        Ok(())
    }

    /// Pick the entity a control item would run for `state`, or the next one
    /// in its cycle when no state is given.
    pub fn resolve_control_entity(
        &self,
        control_id: &str,
        item_id: &str,
        state: Option<&str>,
    ) -> Result<Entity, ExecError> {
        self.store.read(|c| {
            let control = c
                .controls
                .get(control_id)
                .ok_or_else(|| ExecError::ControlNotFound(control_id.to_string()))?;
            let item = control
                .item(item_id)
                .ok_or_else(|| ExecError::ControlItemNotFound {
                    control_id: control_id.to_string(),
                    item_id: item_id.to_string(),
                })?;

            let entity = match state {
                Some(state) => item.entity_by_state(state),
                None => item.next_state_entity(),
            };

            entity.cloned().ok_or_else(|| ExecError::EntityStateNotFound {
                item_id: item_id.to_string(),
                state: state.unwrap_or_default().to_string(),
            })
        })?
    }

    /// Run a control item and return the state it switched to.
    pub async fn exec_control_item(
        &self,
        control_id: &str,
        item_id: &str,
        state: Option<&str>,
    ) -> Result<String, ExecError> {
        let entity = self.resolve_control_entity(control_id, item_id, state)?;
        self.exec_entity(control_id, item_id, &entity).await?;
        Ok(entity.state)
    }

    /// Run the target of an already resolved entity and record its state as
    /// active once it succeeded.
    pub async fn exec_entity(
        &self,
        control_id: &str,
        item_id: &str,
        entity: &Entity,
    ) -> Result<(), ExecError> {
        match entity.kind {
            EntityKind::Command => self.exec_command(&entity.target).await?,
            EntityKind::Scenario => self.exec_scenario_id(&entity.target).await?,
        }

        self.store.set_active_state(control_id, item_id, &entity.state)?;
        self.store.save()?;
        info!("Control {}/{} is now '{}'", control_id, item_id, entity.state);
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.hub.shutdown().await;
    }
}
