use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    ambience::{VOLUME_INIT, VOLUME_MAX},
    endpoints::DEFAULT_DEVICE_NAME,
    error::ConfigError,
    types::SensorChannel,
};

/// Names the JSON config file; [`DEFAULT_CONFIG_PATH`] when unset.
pub const CONFIG_PATH_VAR: &str = "AMBIENCE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./ambience.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub user_agent: String,
    /// Trust any server certificate. Only for tunnel and development hosts.
    pub accept_invalid_certs: bool,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 443,
            user_agent: concat!("ambience-station/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
            connect_timeout_ms: 10_000,
            response_timeout_ms: 15_000,
            max_body_bytes: 16 * 1024,
        }
    }
}

impl ApiConfig {
    pub fn sanitize(&mut self) {
        self.host = self.host.trim().to_string();
        if self.host.is_empty() {
            self.host = Self::default().host;
        }
        if self.port == 0 {
            self.port = 443;
        }
        self.connect_timeout_ms = self.connect_timeout_ms.clamp(500, 120_000);
        self.response_timeout_ms = self.response_timeout_ms.clamp(500, 300_000);
        self.max_body_bytes = self.max_body_bytes.clamp(1024, 1024 * 1024);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub channel: SensorChannel,
    pub sensor_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorNodeConfig {
    pub mac: String,
    pub device_name: String,
    pub report_interval_ms: u64,
    pub channels: Vec<ChannelBinding>,
}

impl Default for SensorNodeConfig {
    fn default() -> Self {
        Self {
            mac: "02:00:00:00:00:01".to_string(),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            report_interval_ms: 60_000,
            channels: SensorChannel::ALL
                .into_iter()
                .zip(1..)
                .map(|(channel, sensor_id)| ChannelBinding { channel, sensor_id })
                .collect(),
        }
    }
}

impl SensorNodeConfig {
    pub fn sanitize(&mut self) {
        self.mac = self.mac.trim().to_string();
        self.report_interval_ms = self.report_interval_ms.max(1_000);
        if self.device_name.trim().is_empty() {
            self.device_name = DEFAULT_DEVICE_NAME.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub poll_interval_ms: u64,
    pub initial_volume: u8,
    pub led_count: usize,
    pub brightness: u8,
    pub status_port: u16,
    /// Serial device of the MP3 player. Unset runs without audio hardware.
    pub audio_device: Option<String>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            initial_volume: VOLUME_INIT,
            led_count: 144,
            brightness: 10,
            status_port: 8443,
            audio_device: None,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl DisplayConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.max(1_000);
        self.initial_volume = self.initial_volume.min(VOLUME_MAX);
        if self.led_count == 0 {
            self.led_count = 144;
        }
    }

    /// Cert and key paths, when both are configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub api: ApiConfig,
    pub sensor: SensorNodeConfig,
    pub display: DisplayConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.api.sanitize();
        self.sensor.sanitize();
        self.display.sanitize();
    }

    /// Reads `path`, then applies env overrides through `var` and sanitizes.
    /// A missing file yields the defaults.
    pub async fn load(
        path: &Path,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match tokio::fs::read(path).await {
            Ok(raw) => {
                serde_json::from_slice::<Self>(&raw).map_err(|source| ConfigError::Invalid {
                    path: path.display().to_string(),
                    source,
                })?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        config.apply_env(var);
        config.sanitize();
        Ok(config)
    }

    /// [`Self::load`] from the file named by `AMBIENCE_CONFIG`, overridden by
    /// the process environment.
    pub async fn load_from_env_path() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(&path, env_var).await
    }

    /// Defaults with the process environment applied, for when the file is
    /// unusable.
    pub fn defaults_from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(env_var);
        config.sanitize();
        config
    }

    /// Applies `API_HOST`, `API_PORT`, `STATION_MAC` and `DISPLAY_HTTP_PORT`
    /// on top of the file values. Unparsable ports are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("API_PORT").and_then(|value| value.parse::<u16>().ok()) {
            self.api.port = port;
        }
        if let Some(mac) = var("STATION_MAC") {
            self.sensor.mac = mac;
        }
        if let Some(port) = var("DISPLAY_HTTP_PORT").and_then(|value| value.parse::<u16>().ok()) {
            self.display.status_port = port;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
