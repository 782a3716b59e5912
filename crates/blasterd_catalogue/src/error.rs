use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read catalogue {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse catalogue {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to serialize catalogue: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write catalogue {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Device {0} not found in catalogue")]
    DeviceNotFound(String),

    #[error("Control item {control_id}/{item_id} not found in catalogue")]
    ControlItemNotFound { control_id: String, item_id: String },

    #[error("Catalogue lock poisoned")]
    Poisoned,
}
