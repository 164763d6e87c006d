//! Application-level configuration loading: listening port, relay policy, heartbeat and
//! the directories served to browsers.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::DeliveryPolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COUCH_ARCADE_CONFIG_PATH";
/// Environment variable carrying the listening port.
const PORT_ENV: &str = "PORT";
/// Port used when [`PORT_ENV`] is unset or unparsable.
pub const DEFAULT_PORT: u16 = 3000;

const DEFAULT_RELAY_BUFFER: usize = 32;
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);
const DEFAULT_PUBLIC_DIR: &str = "public";
const DEFAULT_ROMS_DIR: &str = "public/roms";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    port: u16,
    relay_buffer: usize,
    input_delivery: DeliveryPolicy,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    public_dir: PathBuf,
    roms_dir: PathBuf,
    public_base_url: Option<String>,
}

impl AppConfig {
    /// Load the configuration file and the port from the environment, falling back to
    /// built-in defaults for anything missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_port(resolve_port())
    }

    /// Parse a JSON configuration document; absent keys keep their defaults.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Override the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the relay queue capacity.
    pub fn with_relay_buffer(mut self, relay_buffer: usize) -> Self {
        self.relay_buffer = relay_buffer.max(1);
        self
    }

    /// Override the heartbeat cadence and the silence tolerated before closing.
    pub fn with_heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        let (interval, timeout) = normalize_heartbeat(interval, timeout);
        self.heartbeat_interval = interval;
        self.heartbeat_timeout = timeout;
        self
    }

    /// Override the catalog directory.
    pub fn with_roms_dir(mut self, roms_dir: impl Into<PathBuf>) -> Self {
        self.roms_dir = roms_dir.into();
        self
    }

    /// Override the externally reachable base URL used in join links.
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(base_url.into());
        self
    }

    /// Port the HTTP server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Capacity of each connection's droppable relay queue.
    pub fn relay_buffer(&self) -> usize {
        self.relay_buffer
    }

    /// Send policy applied to relayed input.
    pub fn input_delivery(&self) -> DeliveryPolicy {
        self.input_delivery
    }

    /// Interval between server pings.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Silence after which a connection is considered closed.
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Directory of static UI assets.
    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Directory scanned for game titles.
    pub fn roms_dir(&self) -> &Path {
        &self.roms_dir
    }

    /// Configured base URL for join links, without trailing slash.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            relay_buffer: DEFAULT_RELAY_BUFFER,
            input_delivery: DeliveryPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            roms_dir: PathBuf::from(DEFAULT_ROMS_DIR),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    relay_buffer: Option<usize>,
    input_delivery: Option<DeliveryPolicy>,
    heartbeat_interval_secs: Option<u64>,
    heartbeat_timeout_secs: Option<u64>,
    public_dir: Option<PathBuf>,
    roms_dir: Option<PathBuf>,
    public_base_url: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let (heartbeat_interval, heartbeat_timeout) = normalize_heartbeat(
            value
                .heartbeat_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            value
                .heartbeat_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_timeout),
        );

        Self {
            port: defaults.port,
            relay_buffer: value.relay_buffer.unwrap_or(defaults.relay_buffer).max(1),
            input_delivery: value.input_delivery.unwrap_or(defaults.input_delivery),
            heartbeat_interval,
            heartbeat_timeout,
            public_dir: value.public_dir.unwrap_or(defaults.public_dir),
            roms_dir: value.roms_dir.unwrap_or(defaults.roms_dir),
            public_base_url: value
                .public_base_url
                .filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Keep the interval positive and the timeout strictly longer than one interval.
fn normalize_heartbeat(interval: Duration, timeout: Duration) -> (Duration, Duration) {
    let interval = interval.max(Duration::from_millis(10));
    let timeout = if timeout <= interval {
        warn!(
            ?interval,
            ?timeout,
            "heartbeat timeout must exceed the interval; using three intervals"
        );
        interval * 3
    } else {
        timeout
    };
    (interval, timeout)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Listening port from [`PORT_ENV`], or [`DEFAULT_PORT`].
fn resolve_port() -> u16 {
    env::var(PORT_ENV)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.relay_buffer(), DEFAULT_RELAY_BUFFER);
        assert_eq!(config.input_delivery(), DeliveryPolicy::Volatile);
        assert_eq!(config.heartbeat_interval(), DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(config.roms_dir(), Path::new(DEFAULT_ROMS_DIR));
        assert!(config.public_base_url().is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_json_str(
            r#"{
                "relay_buffer": 4,
                "input_delivery": "reliable",
                "heartbeat_interval_secs": 5,
                "heartbeat_timeout_secs": 20,
                "roms_dir": "/srv/roms",
                "public_base_url": "http://arcade.local:8080/"
            }"#,
        )
        .unwrap();

        assert_eq!(config.relay_buffer(), 4);
        assert_eq!(config.input_delivery(), DeliveryPolicy::Reliable);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(config.heartbeat_timeout(), Duration::from_secs(20));
        assert_eq!(config.roms_dir(), Path::new("/srv/roms"));
        assert_eq!(config.public_base_url(), Some("http://arcade.local:8080"));
    }

    #[test]
    fn timeout_shorter_than_interval_is_widened() {
        let config = AppConfig::from_json_str(
            r#"{"heartbeat_interval_secs": 10, "heartbeat_timeout_secs": 5}"#,
        )
        .unwrap();
        assert_eq!(config.heartbeat_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unknown_delivery_policy_is_rejected() {
        assert!(AppConfig::from_json_str(r#"{"input_delivery": "sometimes"}"#).is_err());
    }

    #[test]
    fn zero_relay_buffer_is_clamped() {
        let config = AppConfig::from_json_str(r#"{"relay_buffer": 0}"#).unwrap();
        assert_eq!(config.relay_buffer(), 1);
    }
}
