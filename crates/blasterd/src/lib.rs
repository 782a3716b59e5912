pub mod api;
pub mod engine;
pub mod hub;
pub mod intents;
pub mod logging;
#[cfg(feature = "relay_mqtt")]
pub mod relay;
pub mod settings;

pub use engine::Engine;
pub use engine::ExecError;
pub use hub::BridgeHub;
pub use hub::Hub;
pub use settings::LogLevel;
pub use settings::Settings;
pub use settings::SettingsError;
