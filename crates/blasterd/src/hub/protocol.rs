//! Protocol spoken with the vendor bridge process.
//!
//! Newline-delimited JSON over the bridge's stdin/stdout. Every request gets
//! exactly one reply; the bridge may interleave `log` lines which are
//! forwarded to tracing and are not replies.

use serde::Deserialize;
use serde::Serialize;

use super::DeviceInfo;

/// Messages sent from blasterd to the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Broadcast a discovery request and report every device that answered
    Discover { timeout_secs: u64 },

    /// Register a device without discovering it
    AddDevice { device: DeviceInfo },

    /// Replay a learned code
    Execute { mac: String, code: String },

    /// Query a smart plug's relay state
    PowerState { mac: String },

    /// Graceful shutdown signal
    Shutdown,
}

/// Messages sent from the bridge to blasterd
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Bridge started and is ready for requests
    Ready,

    /// Discovery result
    Devices { devices: Vec<DeviceInfo> },

    /// Request completed without a payload
    Done,

    Power { on: bool },

    /// Log message from the bridge
    Log { level: LogLevel, message: String },

    /// Request failed
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encoding() {
        let json = serde_json::to_string(&Request::Execute {
            mac: "aa:bb:cc:dd:ee:ff".to_string(),
            code: "2600".to_string(),
        })
        .unwrap();

        assert_eq!(
            json,
            r#"{"type":"execute","mac":"aa:bb:cc:dd:ee:ff","code":"2600"}"#
        );
    }

    #[test]
    fn test_reply_decoding() {
        let reply: Reply = serde_json::from_str(
            r#"{"type":"devices","devices":[{"ip":"10.0.0.2","mac":"aa:bb:cc:dd:ee:ff","device_type":"0x5f36"}]}"#,
        )
        .unwrap();

        match reply {
            Reply::Devices { devices } => {
                assert_eq!(devices.len(), 1);
                assert_eq!(devices[0].device_type, "0x5f36");
                assert_eq!(devices[0].key, "");
            }
            other => panic!("unexpected reply: {:?}", other),
        }

        let reply: Reply =
            serde_json::from_str(r#"{"type":"log","level":"warning","message":"slow"}"#).unwrap();
        assert!(matches!(reply, Reply::Log { level: LogLevel::Warning, .. }));
    }
}
