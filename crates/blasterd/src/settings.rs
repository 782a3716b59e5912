//! Service settings.
//!
//! blasterd reads an optional TOML file for its own settings (server, logging,
//! vendor bridge, intent relay). The device catalogue is a separate JSON file
//! handled by `blasterd_catalogue`. Command line flags override the file.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

/// Top-level settings structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the JSON device catalogue
    pub catalogue: Option<PathBuf>,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub bridge: BridgeSettings,
    pub relay: RelaySettings,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("invalid log level '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: LogLevel,

    /// Per-target levels, e.g. `tower_http = "debug"`
    pub overrides: HashMap<String, LogLevel>,

    /// Write logs to this file instead of stdout
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unsupported protocol '{}', expected http or https", other)),
        }
    }
}

/// HTTP API server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub protocol: Protocol,
    pub listen: String,
    pub port: u16,

    /// Bearer token required on every request, if set
    pub token: Option<String>,

    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            listen: "127.0.0.1".to_string(),
            port: 8787,
            token: None,
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl ServerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.protocol == Protocol::Https && (self.tls_cert.is_none() || self.tls_key.is_none()) {
            return Err(SettingsError::MissingTls);
        }
        Ok(())
    }
}

/// Vendor bridge process settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Executable speaking the bridge protocol on stdin/stdout
    pub program: PathBuf,
    pub args: Vec<String>,

    /// Timeout for a single execute/query round trip
    pub timeout_secs: u64,

    /// How long the bridge listens for discovery replies
    pub discover_timeout_secs: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("blasterd-bridge"),
            args: Vec::new(),
            timeout_secs: 10,
            discover_timeout_secs: 5,
        }
    }
}

/// MQTT → HTTP intent relay settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,

    /// Intent endpoint of the blasterd API server
    pub endpoint: String,

    /// Bearer token sent to the endpoint
    pub token: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "blasterd-relay".to_string(),
            topic: "blasterd/intents".to_string(),
            endpoint: "http://127.0.0.1:8787/run/intent".to_string(),
            token: None,
            username: None,
            password: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SettingsError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(SettingsError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TLS certificate and key files are required when using https")]
    MissingTls,

    #[error("No catalogue configured, pass --catalogue or set `catalogue` in the settings file")]
    MissingCatalogue,
}
