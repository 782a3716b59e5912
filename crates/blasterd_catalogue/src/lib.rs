//! Device catalogue for blasterd.
//!
//! The catalogue is a single JSON document describing the remote-control
//! devices on the network, the IR/RF commands learned for them, scenarios
//! chaining those commands, voice-assistant intent mappings and the UI
//! controls grouping everything into buttons.

mod catalogue;
mod control;
mod device;
mod error;
mod intent;
mod store;

pub use catalogue::Catalogue;
pub use control::Control;
pub use control::ControlItem;
pub use control::Entity;
pub use control::EntityKind;
pub use control::STATE_NA;
pub use control::STATE_OFF;
pub use control::STATE_ON;
pub use device::Command;
pub use device::Device;
pub use device::DeviceCategory;
pub use device::Scenario;
pub use device::SequenceItem;
pub use error::StoreError;
pub use intent::CommandIntent;
pub use intent::eq_fold;
pub use intent::CommandSlot;
pub use intent::Intent;
pub use intent::Slot;
pub use intent::SlotValue;
pub use store::Store;
