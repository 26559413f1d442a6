use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub line: LineConfig,
    #[serde(default)]
    pub ur: UrConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    /// Units users may subscribe to, upserted by name at startup
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    pub channel_access_token: String,
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UrConfig {
    /// Vacancy endpoint, posted one form per danchi
    #[serde(default = "default_ur_api_url")]
    pub api_url: String,
    /// Prefixed onto relative room links
    #[serde(default = "default_ur_site_base")]
    pub site_base: String,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
}

impl Default for UrConfig {
    fn default() -> Self {
        Self {
            api_url: default_ur_api_url(),
            site_base: default_ur_site_base(),
            timeout_sec: default_timeout_sec(),
        }
    }
}

fn default_ur_api_url() -> String {
    "https://chintai.r6.ur-net.go.jp/chintai/api/bukken/detail/detail_bukken_room/".to_string()
}

fn default_ur_site_base() -> String {
    "https://www.ur-net.go.jp".to_string()
}

fn default_timeout_sec() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "data/logs".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token required on `GET /check-rooms`; open when unset
    #[serde(default)]
    pub check_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            check_token: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    /// Fixed delay between two units in one run (default: 2 seconds)
    #[serde(default = "default_unit_delay_ms")]
    pub unit_delay_ms: u64,
    /// Random extra delay before each in-process run
    #[serde(default)]
    pub jitter_ms: u64,
    /// In-process polling period; without it polling only happens on `GET /check-rooms`
    #[serde(default)]
    pub interval_sec: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            unit_delay_ms: default_unit_delay_ms(),
            jitter_ms: 0,
            interval_sec: None,
        }
    }
}

fn default_unit_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct UnitConfig {
    pub name: String,
    /// UR danchi code, e.g. `20_1310`
    pub code: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(config::Environment::with_prefix("URBOT").separator("__"));

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.logging.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "info" => tracing::Level::INFO,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}
