use crate::error::MonitorError;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub graphite: GraphiteConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphiteConfig {
    #[serde(default = "default_graphite_host")]
    pub host: String,
    #[serde(default = "default_graphite_port")]
    pub port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Identity of the machine running the status command; only the first
    /// label of a fully qualified name ends up in metric names.
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,
    #[serde(default = "default_status_command")]
    pub status_command: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_database_url() -> SecretString {
    SecretString::from(String::new())
}

fn default_max_connections() -> u32 {
    2
}

fn default_graphite_host() -> String {
    "localhost".to_string()
}

fn default_graphite_port() -> u16 {
    2003
}

fn default_prefix() -> String {
    "cinc".to_string()
}

fn default_interval() -> u64 {
    60
}

fn default_stale_after_minutes() -> u64 {
    60
}

fn default_status_command() -> Vec<String> {
    vec![
        "sudo".to_string(),
        "cinc-server-ctl".to_string(),
        "status".to_string(),
    ]
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9108
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        Self {
            host: default_graphite_host(),
            port: default_graphite_port(),
            prefix: default_prefix(),
            hostname: None,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            stale_after_minutes: default_stale_after_minutes(),
            status_command: default_status_command(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl GraphiteConfig {
    /// First label of the configured hostname, if any.
    pub fn host_segment(&self) -> Option<&str> {
        self.hostname
            .as_deref()
            .and_then(|name| name.split('.').next())
            .filter(|label| !label.is_empty())
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("CINC_MONITOR").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Check values that serde defaults cannot guard.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.database.url.expose_secret().trim().is_empty() {
            return Err(MonitorError::Config(
                "database.url is required (set DATABASE_URL)".to_string(),
            ));
        }
        if self.poller.status_command.is_empty() {
            return Err(MonitorError::Config(
                "poller.status_command must name a program".to_string(),
            ));
        }
        if self.poller.stale_after_minutes == 0 {
            return Err(MonitorError::Config(
                "poller.stale_after_minutes must be greater than zero".to_string(),
            ));
        }
        if self.poller.interval_seconds == 0 {
            return Err(MonitorError::Config(
                "poller.interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.graphite.prefix.trim().is_empty() {
            return Err(MonitorError::Config(
                "graphite.prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
