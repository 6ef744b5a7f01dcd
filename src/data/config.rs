//! Application Configuration
//!
//! Handles loading and saving the kiosk configuration.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Kiosk configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl KioskConfig {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Load configuration from the default path or create it
    pub fn load_or_default() -> Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = KioskConfig::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: KioskConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Which transport talks to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Websocket,
    Polling,
}

/// Backend location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Overrides the socket address derived from `base_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket_url: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            websocket_url: None,
            transport: TransportKind::default(),
        }
    }
}

impl ServerConfig {
    /// Base URL for the REST surface
    pub fn http_base(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("invalid base_url {}", self.base_url))
    }

    /// Socket endpoint.
    ///
    /// The backend serves its socket one port above the HTTP port, so unless
    /// `websocket_url` is set the address is derived from `base_url`.
    pub fn websocket_url(&self) -> Result<Url> {
        if let Some(explicit) = &self.websocket_url {
            return Url::parse(explicit)
                .with_context(|| format!("invalid websocket_url {}", explicit));
        }

        let base = self.http_base()?;
        let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
        let host = base
            .host_str()
            .ok_or_else(|| anyhow!("base_url {} has no host", self.base_url))?;
        let port = base
            .port_or_known_default()
            .ok_or_else(|| anyhow!("base_url {} has no port", self.base_url))?;
        let port = port
            .checked_add(1)
            .ok_or_else(|| anyhow!("base_url {} port has no successor", self.base_url))?;

        Url::parse(&format!("{}://{}:{}", scheme, host, port))
            .with_context(|| format!("deriving socket url from {}", self.base_url))
    }
}

/// Socket reconnect and health-check tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_health_check_interval_ms() -> u64 {
    5000
}

fn default_stale_after_ms() -> u64 {
    30_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            health_check_interval_ms: default_health_check_interval_ms(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl ConnectionConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

/// Polling transport tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_repoll_delay_ms")]
    pub repoll_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_repoll_delay_ms() -> u64 {
    100
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            repoll_delay_ms: default_repoll_delay_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn repoll_delay(&self) -> Duration {
        Duration::from_millis(self.repoll_delay_ms)
    }
}

/// View timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    #[serde(default = "default_send_reenable_delay_ms")]
    pub send_reenable_delay_ms: u64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_paint_interval_ms")]
    pub paint_interval_ms: u64,
}

fn default_toast_duration_ms() -> u64 {
    5000
}

fn default_send_reenable_delay_ms() -> u64 {
    500
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_paint_interval_ms() -> u64 {
    100
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            toast_duration_ms: default_toast_duration_ms(),
            send_reenable_delay_ms: default_send_reenable_delay_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            paint_interval_ms: default_paint_interval_ms(),
        }
    }
}

impl UiConfig {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn send_reenable_delay(&self) -> Duration {
        Duration::from_millis(self.send_reenable_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn paint_interval(&self) -> Duration {
        Duration::from_millis(self.paint_interval_ms)
    }
}
