use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::http::HttpVersion;

static CONFIG: OnceLock<ServerConfig> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to deserialize config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub buffer_size: usize,

    pub http_version: HttpVersion,
    pub max_path_size: usize,
    pub max_header_size: usize,
    pub max_body_size: usize,

    #[serde(deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub write_timeout: Duration,

    /// Directory served by the static-asset route. Empty disables it.
    pub static_files_root: String,
    /// URL prefix the static-asset route answers under.
    pub static_prefix: String,
    /// Directory templates are loaded from. Empty disables the view.
    pub templates_root: String,

    pub server_name: String,

    /// `tracing-subscriber` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            buffer_size: 4096,

            http_version: HttpVersion::V1_1,
            max_path_size: 1024,
            max_header_size: 8192,
            max_body_size: 1024 * 1024, // 1 MB

            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),

            static_files_root: "./static".to_string(),
            static_prefix: "/static".to_string(),
            templates_root: String::new(),

            server_name: "rustyroute/0.1".to_string(),

            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads and deserializes `path`. Fields missing from the file keep
    /// their defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ServerConfig>(content)
    }
}

/// Installs the process-wide config. Returns `false` if one was already set.
pub fn set_config(cfg: ServerConfig) -> bool {
    CONFIG.set(cfg).is_ok()
}

/// The installed config, or the defaults when none was installed.
pub fn config() -> &'static ServerConfig {
    CONFIG.get_or_init(ServerConfig::default)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
