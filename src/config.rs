use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FrontdeskConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub irc: IrcConfig,
    pub presence: PresenceConfig,
    pub site: SiteConfig,
    pub sharing: SharingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub http_enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IrcConfig {
    pub server: String,
    pub port: u16,
    pub nick: String,
    pub realname: String,
    pub channel: String,
    pub reconnect_base_secs: u64,
    pub reconnect_max_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PresenceConfig {
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SiteConfig {
    /// Prefix for permalinks sent to returning users, without a trailing slash.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SharingConfig {
    pub bitly_token: Option<String>,
    pub webhook_url: Option<String>,
    /// CSV file of `nick,handle` pairs used for "via @handle" attribution.
    pub handle_file: Option<String>,
}

impl Default for FrontdeskConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            irc: IrcConfig::default(),
            presence: PresenceConfig::default(),
            site: SiteConfig::default(),
            sharing: SharingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            http_enabled: true,
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_frontdesk_dir()
            .join("frontdesk.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: "irc.libera.chat".into(),
            port: 6667,
            nick: "frontdesk".into(),
            realname: "frontdesk channel logger".into(),
            channel: "#frontdesk".into(),
            reconnect_base_secs: 5,
            reconnect_max_secs: 300,
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
        }
    }
}

impl PresenceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Returns `~/.frontdesk/`
pub fn default_frontdesk_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".frontdesk")
}

/// Returns the default config file path: `~/.frontdesk/config.toml`
pub fn default_config_path() -> PathBuf {
    default_frontdesk_dir().join("config.toml")
}

impl FrontdeskConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            FrontdeskConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `FRONTDESK_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FRONTDESK_DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("FRONTDESK_CHANNEL") {
            self.irc.channel = val;
        }
        if let Ok(val) = std::env::var("FRONTDESK_NICK") {
            self.irc.nick = val;
        }
        if let Ok(val) = std::env::var("FRONTDESK_SERVER") {
            self.irc.server = val;
        }
        if let Ok(val) = std::env::var("FRONTDESK_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid FRONTDESK_PORT"),
            }
        }
        if let Ok(val) = std::env::var("FRONTDESK_BASE_URL") {
            self.site.base_url = val;
        }
        if let Ok(val) = std::env::var("FRONTDESK_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
