// config.rs
use crate::error::ConfigError;
use crate::global_variables::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_BROADCAST_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT,
    DEFAULT_SERVER_URL,
};
use std::str::FromStr;
use std::time::Duration;

/// Relay server settings. Every field can be overridden from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origin: String,
    pub broadcast_interval: Duration,
    /// Fixed seed for the simulation RNG; `None` seeds from the OS.
    pub simulation_seed: Option<u64>,
    /// Push the latest snapshot to a WebSocket subscriber as soon as it connects.
    pub snapshot_on_connect: bool,
    /// Also publish every tick to this AMQP broker when set.
    pub amqp_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            broadcast_interval: Duration::from_millis(DEFAULT_BROADCAST_INTERVAL_MS),
            simulation_seed: None,
            snapshot_on_connect: false,
            amqp_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            allowed_origin: lookup("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            broadcast_interval: parse_millis_or(
                &lookup,
                "BROADCAST_INTERVAL_MS",
                defaults.broadcast_interval,
            )?,
            simulation_seed: parse_optional(&lookup, "SIMULATION_SEED")?,
            snapshot_on_connect: parse_or(
                &lookup,
                "SNAPSHOT_ON_CONNECT",
                defaults.snapshot_on_connect,
            )?,
            amqp_url: lookup("TELEMETRY_AMQP_URL").filter(|url| !url.trim().is_empty()),
        })
    }
}

/// Settings shared by the dashboard clients (subscriber and poller).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base `http://` URL of the relay server.
    pub server_url: String,
    pub poll_interval: Duration,
    pub amqp_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            amqp_url: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let server_url = lookup("DASHBOARD_SERVER_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.server_url);
        // the HTTP and WebSocket clients are built without TLS
        if !server_url.starts_with("http://") {
            return Err(ConfigError::InvalidValue {
                key: "DASHBOARD_SERVER_URL",
                value: server_url,
                reason: "expected an http:// URL".to_string(),
            });
        }
        Ok(Self {
            server_url,
            poll_interval: parse_millis_or(&lookup, "POLL_INTERVAL_MS", defaults.poll_interval)?,
            amqp_url: lookup("TELEMETRY_AMQP_URL").filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn data_url(&self) -> String {
        format!("{}/data", self.server_url)
    }

    /// WebSocket endpoint derived from the HTTP base URL.
    pub fn websocket_url(&self) -> String {
        let host = self
            .server_url
            .strip_prefix("http://")
            .unwrap_or(&self.server_url);
        format!("ws://{}/ws", host)
    }
}

fn parse_optional<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_millis_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_optional::<F, u64>(lookup, key)? {
        None => Ok(default),
        Some(0) => Err(ConfigError::InvalidValue {
            key,
            value: "0".to_string(),
            reason: "interval must be positive".to_string(),
        }),
        Some(ms) => Ok(Duration::from_millis(ms)),
    }
}
