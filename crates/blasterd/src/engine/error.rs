use blasterd_catalogue::StoreError;

use crate::hub::HubError;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Device {0} not found")]
    DeviceNotFound(String),

    #[error("Command {0} not found")]
    CommandNotFound(String),

    #[error("Scenario {0} not found")]
    ScenarioNotFound(String),

    #[error("Control {0} not found")]
    ControlNotFound(String),

    #[error("Control item {item_id} not found in control {control_id}")]
    ControlItemNotFound { control_id: String, item_id: String },

    #[error("Control item {item_id} has no entity for state '{state}'")]
    EntityStateNotFound { item_id: String, state: String },

    #[error("Scenario {0} has no commands")]
    EmptyScenario(String),

    #[error("device control busy")]
    Busy,

    #[error("Hub error: {0}")]
    Transport(#[source] HubError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExecError {
    /// Whether the error is a failed lookup of something the caller named.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExecError::DeviceNotFound(_)
                | ExecError::CommandNotFound(_)
                | ExecError::ScenarioNotFound(_)
                | ExecError::ControlNotFound(_)
                | ExecError::ControlItemNotFound { .. }
                | ExecError::EntityStateNotFound { .. }
        )
    }
}
