use serde::Deserialize;
use serde::Serialize;

/// Power state of a switch, as pushed to `/device/state` subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Catalogue key (MAC) of the device.
    pub id: String,

    /// `on` or `off`.
    pub state: String,
}
