//! ADB reverse tunnel
//!
//! Makes `localhost:<port>` on the phone reach the listener on this machine
//! by running `adb reverse tcp:<port> tcp:<port>`.

use regex::Regex;
use std::io::ErrorKind;
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;

// "<serial>\tdevice" lines; unauthorized and offline entries don't match
static DEVICE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+device(?:\s|$)").unwrap()
});

const DEVICE_LIST_HEADER: &str = "List of devices attached";

/// Errors from running adb
#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("'{0}' command not found. Are the Android platform tools installed?")]
    AdbNotFound(String),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// State of the link to the phone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    NoDeviceDetected,
    Connected,
}

/// Connection state plus a human-readable detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub detail: String,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            detail: "Disconnected".to_string(),
        }
    }

    pub fn no_device() -> Self {
        Self {
            state: ConnectionState::NoDeviceDetected,
            detail: "No phone detected".to_string(),
        }
    }

    pub fn connected(devices: &[String], port: u16) -> Self {
        Self {
            state: ConnectionState::Connected,
            detail: format!("Connected, tunnel active on port {} ({})", port, devices.join(", ")),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Serials of attached devices that are ready for use
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with(DEVICE_LIST_HEADER) && !line.starts_with('*'))
        .filter_map(|line| DEVICE_LINE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Runner for the adb commands behind the Connect button
#[derive(Debug, Clone)]
pub struct Tunnel {
    adb_path: String,
}

impl Tunnel {
    pub fn new(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    /// Serials reported by `adb devices` in the `device` state
    pub fn list_devices(&self) -> Result<Vec<String>, TunnelError> {
        let stdout = self.run(&["devices"])?;
        Ok(parse_device_list(&stdout))
    }

    /// Set up the reverse forward for `port` if a phone is attached
    pub fn connect(&self, port: u16) -> Result<ConnectionStatus, TunnelError> {
        let devices = self.list_devices()?;
        if devices.is_empty() {
            log::warn!("adb reports no attached device");
            return Ok(ConnectionStatus::no_device());
        }

        let spec = format!("tcp:{}", port);
        self.run(&["reverse", &spec, &spec])?;
        log::info!("Reverse tunnel {} active for {}", spec, devices.join(", "));
        Ok(ConnectionStatus::connected(&devices, port))
    }

    fn run(&self, args: &[&str]) -> Result<String, TunnelError> {
        log::debug!("Running {} {}", self.adb_path, args.join(" "));
        let output = Command::new(&self.adb_path).args(args).output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                TunnelError::AdbNotFound(self.adb_path.clone())
            } else {
                TunnelError::Spawn {
                    program: self.adb_path.clone(),
                    source: e,
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TunnelError::CommandFailed {
                command: format!("{} {}", self.adb_path, args.join(" ")),
                stderr: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn test_parse_ready_devices() {
        let output = "List of devices attached\nR58N12ABCDE\tdevice\nemulator-5554\tdevice product:sdk model:x\n\n";
        assert_eq!(parse_device_list(output), vec!["R58N12ABCDE", "emulator-5554"]);
    }

    #[test]
    fn test_parse_skips_unready_devices() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\
                      R58N12ABCDE\tunauthorized\n\
                      0123456789\toffline\n\
                      device42\tdevice\n";
        assert_eq!(parse_device_list(output), vec!["device42"]);
    }

    #[test]
    fn test_missing_adb() {
        let tunnel = Tunnel::new("definitely-not-an-adb-binary-4f2c");
        assert!(matches!(tunnel.list_devices(), Err(TunnelError::AdbNotFound(_))));
        assert!(matches!(tunnel.connect(5000), Err(TunnelError::AdbNotFound(_))));
    }

    #[test]
    fn test_status_constructors() {
        assert_eq!(ConnectionStatus::default().state, ConnectionState::Disconnected);
        assert_eq!(ConnectionStatus::no_device().state, ConnectionState::NoDeviceDetected);

        let status = ConnectionStatus::connected(&["abc".to_string()], 5000);
        assert!(status.is_connected());
        assert!(status.detail.contains("5000"));
        assert!(status.detail.contains("abc"));
    }
}
