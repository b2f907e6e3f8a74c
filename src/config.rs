//! Application configuration
//!
//! Loaded from config.json; every field falls back to a default so a
//! missing or partial file still yields a working setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides `server.port`
pub const PORT_ENV_VAR: &str = "PHONE_UPLINK_PORT";

/// Root application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub tunnel: TunnelConfig,
}

/// Upload listener configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the single upload endpoint
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Number of threads servicing requests
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Directory that receives one file per uploaded batch
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_upload_path() -> String {
    "/api/upload".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Kopia_S20")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            upload_path: default_upload_path(),
            workers: default_workers(),
            output_dir: default_output_dir(),
        }
    }
}

/// Window configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiConfig {
    /// How often the window drains the bridge
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Oldest lines are dropped beyond this many
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_max_log_lines() -> usize {
    1000
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_log_lines: default_max_log_lines(),
        }
    }
}

impl UiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// ADB tunnel configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TunnelConfig {
    /// adb executable, looked up on PATH unless absolute
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
}

fn default_adb_path() -> String {
    "adb".to_string()
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from config.json, then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env_overrides(std::env::var(PORT_ENV_VAR).ok().as_deref());
        config
    }

    fn load_file() -> Self {
        // Try to load from current directory first
        if let Ok(config) = Self::load_from_path("config.json") {
            log::info!("Loaded config from ./config.json");
            return config;
        }

        // Try to load from executable directory
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let config_path = exe_dir.join("config.json");
                if let Ok(config) = Self::load_from_path(&config_path) {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
            }
        }

        log::info!("No config.json found, using defaults");
        Self::default()
    }

    fn apply_env_overrides(&mut self, port: Option<&str>) {
        let Some(raw) = port else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => {
                log::info!("Port overridden by {}: {}", PORT_ENV_VAR, port);
                self.server.port = port;
            }
            Err(e) => log::warn!("Ignoring {}={:?}: {}", PORT_ENV_VAR, raw, e),
        }
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.into();
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
