//! Hub backed by an external vendor bridge process.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::protocol::LogLevel;
use super::protocol::Reply;
use super::protocol::Request;
use super::DeviceInfo;
use super::DeviceTable;
use super::Hub;
use super::HubError;
use crate::settings::BridgeSettings;

/// Drives the vendor bridge over stdin/stdout.
///
/// The process is spawned lazily on the first request and respawned after a
/// transport failure. The live device table is kept on this side so that
/// lookups never need a round trip.
pub struct BridgeHub {
    settings: BridgeSettings,
    process: tokio::sync::Mutex<Option<BridgeProcess>>,
    table: Mutex<DeviceTable>,
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl BridgeHub {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings,
            process: tokio::sync::Mutex::new(None),
            table: Mutex::new(DeviceTable::default()),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    async fn spawn(&self) -> Result<BridgeProcess, HubError> {
        info!(
            "Starting vendor bridge: {} {:?}",
            self.settings.program.display(),
            self.settings.args
        );

        let mut child = Command::new(&self.settings.program)
            .args(&self.settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(HubError::Closed)?;
        let stdout = child.stdout.take().ok_or(HubError::Closed)?;

        let mut process = BridgeProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        match process.recv_within(self.timeout()).await? {
            Reply::Ready => {
                info!("Vendor bridge ready");
                Ok(process)
            }
            other => Err(HubError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    /// Send one request and wait for its reply.
    async fn request(&self, request: Request, timeout: Duration) -> Result<Reply, HubError> {
        let mut guard = self.process.lock().await;

        if guard.is_none() {
            *guard = Some(self.spawn().await?);
        }
        let process = guard.as_mut().ok_or(HubError::Closed)?;

        debug!("Bridge request: {:?}", request);
        let result = process.round_trip(&request, timeout).await;

        match &result {
            Ok(Reply::Error { message }) => {
                debug!("Bridge error reply: {}", message);
            }
            Ok(_) => {}
            Err(e) => {
                // The stream may be out of step with our requests now
                warn!("Bridge transport failed, restarting on next request: {}", e);
                *guard = None;
            }
        }

        result
    }

    fn ensure_known(&self, mac: &str) -> Result<(), HubError> {
        let table = self.table.lock().map_err(|_| HubError::Closed)?;
        if table.contains(mac) {
            Ok(())
        } else {
            Err(HubError::UnknownDevice(mac.to_string()))
        }
    }
}

impl BridgeProcess {
    async fn send(&mut self, request: &Request) -> Result<(), HubError> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Reply, HubError> {
        loop {
            let line = self.stdout.next_line().await?.ok_or(HubError::Closed)?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line)? {
                Reply::Log { level, message } => match level {
                    LogLevel::Debug => debug!("[bridge] {}", message),
                    LogLevel::Info => info!("[bridge] {}", message),
                    LogLevel::Warning => warn!("[bridge] {}", message),
                    LogLevel::Error => error!("[bridge] {}", message),
                },
                reply => return Ok(reply),
            }
        }
    }

    async fn recv_within(&mut self, timeout: Duration) -> Result<Reply, HubError> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| HubError::Timeout(timeout))?
    }

    async fn round_trip(&mut self, request: &Request, timeout: Duration) -> Result<Reply, HubError> {
        self.send(request).await?;
        self.recv_within(timeout).await
    }
}

fn unexpected(reply: Reply) -> HubError {
    match reply {
        Reply::Error { message } => HubError::Bridge(message),
        other => HubError::UnexpectedReply(format!("{:?}", other)),
    }
}

#[async_trait]
impl Hub for BridgeHub {
    async fn discover(&self) -> Result<Vec<DeviceInfo>, HubError> {
        let timeout_secs = self.settings.discover_timeout_secs;
        let reply = self
            .request(
                Request::Discover { timeout_secs },
                Duration::from_secs(timeout_secs) + self.timeout(),
            )
            .await?;

        match reply {
            Reply::Devices { devices } => {
                info!("Discovered {} devices", devices.len());
                self.table
                    .lock()
                    .map_err(|_| HubError::Closed)?
                    .replace(devices.clone());
                Ok(devices)
            }
            other => Err(unexpected(other)),
        }
    }

    async fn execute(&self, mac: &str, code: &str) -> Result<(), HubError> {
        self.ensure_known(mac)?;

        let request = Request::Execute {
            mac: mac.to_string(),
            code: code.to_string(),
        };
        match self.request(request, self.timeout()).await? {
            Reply::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn device_info(&self, mac: &str) -> Result<DeviceInfo, HubError> {
        self.table
            .lock()
            .map_err(|_| HubError::Closed)?
            .get(mac)
            .cloned()
            .ok_or_else(|| HubError::UnknownDevice(mac.to_string()))
    }

    async fn add_manual_device(&self, device: DeviceInfo) -> Result<(), HubError> {
        let request = Request::AddDevice {
            device: device.clone(),
        };
        match self.request(request, self.timeout()).await? {
            Reply::Done => {
                self.table
                    .lock()
                    .map_err(|_| HubError::Closed)?
                    .insert(device);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn power_state(&self, mac: &str) -> Result<bool, HubError> {
        self.ensure_known(mac)?;

        let request = Request::PowerState {
            mac: mac.to_string(),
        };
        match self.request(request, self.timeout()).await? {
            Reply::Power { on } => Ok(on),
            other => Err(unexpected(other)),
        }
    }

    async fn shutdown(&self) {
        let mut guard = self.process.lock().await;
        if let Some(mut process) = guard.take() {
            if let Err(e) = process.send(&Request::Shutdown).await {
                warn!("Failed to send shutdown to bridge: {}", e);
            }
            match tokio::time::timeout(self.timeout(), process.child.wait()).await {
                Ok(Ok(status)) => info!("Vendor bridge exited with {}", status),
                Ok(Err(e)) => warn!("Failed to wait for vendor bridge: {}", e),
                Err(_) => warn!("Vendor bridge did not exit in time, killing it"),
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;

    /// A bridge written in shell that understands just enough of the protocol.
    const FAKE_BRIDGE: &str = r#"
echo '{"type":"ready"}'
while read -r line; do
  case "$line" in
    *'"discover"'*)
      echo '{"type":"log","level":"info","message":"probing"}'
      echo '{"type":"devices","devices":[{"id":"10039","name":"RM4","ip":"10.0.0.2","mac":"AA:BB:CC:DD:EE:FF","key":"k1","device_type":"0x5f36"}]}'
      ;;
    *'"add_device"'*) echo '{"type":"done"}' ;;
    *'"execute"'*) echo '{"type":"done"}' ;;
    *'"power_state"'*) echo '{"type":"power","on":true}' ;;
    *'"shutdown"'*) exit 0 ;;
    *) echo '{"type":"error","message":"unsupported"}' ;;
  esac
done
"#;

    fn fake_bridge(script: &str) -> BridgeHub {
        BridgeHub::new(BridgeSettings {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_secs: 5,
            discover_timeout_secs: 1,
        })
    }

    #[tokio::test]
    async fn test_discover_populates_table() {
        let hub = fake_bridge(FAKE_BRIDGE);

        let devices = hub.discover().await.unwrap();
        assert_eq!(devices.len(), 1);

        let info = hub.device_info("aa:bb:cc:dd:ee:ff").await.unwrap();
        assert_eq!(info.ip, "10.0.0.2");
        assert_eq!(info.key, "k1");

        hub.execute("aa:bb:cc:dd:ee:ff", "2600").await.unwrap();
        assert!(hub.power_state("aa:bb:cc:dd:ee:ff").await.unwrap());

        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_execute_unknown_device_skips_bridge() {
        // The bridge would fail to start; it must never be spawned.
        let hub = fake_bridge("exit 1");

        let err = hub.execute("aa:bb:cc:dd:ee:ff", "2600").await.unwrap_err();
        assert!(matches!(err, HubError::UnknownDevice(_)));
    }

    #[tokio::test]
    async fn test_manual_device_is_executable() {
        let hub = fake_bridge(FAKE_BRIDGE);

        hub.add_manual_device(DeviceInfo {
            mac: "11:22:33:44:55:66".to_string(),
            ip: "10.0.0.9".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        hub.execute("11:22:33:44:55:66", "2600").await.unwrap();
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_bridge_exit_is_reported() {
        let hub = fake_bridge(r#"echo '{"type":"ready"}'; read -r line; exit 0"#);

        let err = hub.discover().await.unwrap_err();
        assert!(matches!(err, HubError::Closed));
    }
}
