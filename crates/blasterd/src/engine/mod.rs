mod discovery;
mod engine;
mod error;
mod lock;
mod state;

pub use discovery::DiscoveredDevice;
pub use discovery::DiscoveryStatus;
pub use engine::Engine;
pub use error::ExecError;
pub use lock::HardwareGuard;
pub use lock::HardwareLock;
pub use state::DeviceState;
