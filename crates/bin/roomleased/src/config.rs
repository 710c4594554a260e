//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `roomlease.toml` in the working directory, or at the path in
//! `ROOMLEASE_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use serde::Deserialize;

use roomlease_adapter_http_axum::MetricsConfig;
use roomlease_adapter_mqtt::MqttConfig;
use roomlease_adapter_virtual::SimulationConfig;
use roomlease_app::scheduler::SchedulerConfig;

const DEFAULT_PATH: &str = "roomlease.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Admission control settings.
    pub scheduler: SchedulerConfig,
    /// Message transport settings.
    pub bus: BusConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulated rooms.
    pub simulation: SimulationConfig,
    /// Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
}

/// Which transport carries the messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusKind {
    /// Everything in this process, over a broadcast channel.
    #[default]
    InProcess,
    /// An external MQTT broker.
    Mqtt,
}

impl std::str::FromStr for BusKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_process" | "in-process" | "local" => Ok(Self::InProcess),
            "mqtt" => Ok(Self::Mqtt),
            other => Err(ConfigError::Validation(format!("unknown bus kind {other:?}"))),
        }
    }
}

/// Transport configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub kind: BusKind,
    /// Capacity of the in-process broadcast channel (also used as the local
    /// fan-out behind MQTT).
    pub capacity: usize,
    pub mqtt: MqttConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ROOMLEASE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides looked up through `var`. Unparseable numbers and
    /// unknown bus kinds are ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(max) = var("ROOMLEASE_MAX_LEASES").and_then(|val| val.parse().ok()) {
            self.scheduler.max_concurrent_leases = max;
        }
        if let Some(ms) = var("ROOMLEASE_LEASE_MS").and_then(|val| val.parse().ok()) {
            self.scheduler.lease_duration_ms = ms;
        }
        if let Some(kind) = var("ROOMLEASE_BUS").and_then(|val| val.parse().ok()) {
            self.bus.kind = kind;
        }
        if let Some(url) = var("MQTT_BROKER_URL") {
            if let Some((host, port)) = parse_broker_url(&url) {
                self.bus.mqtt.broker_host = host;
                if let Some(port) = port {
                    self.bus.mqtt.broker_port = port;
                }
            }
        }
        if let Some(username) = var("MQTT_USERNAME") {
            self.bus.mqtt.username = Some(username);
        }
        if let Some(password) = var("MQTT_PASSWORD") {
            self.bus.mqtt.password = Some(password);
        }
        if let Some(enabled) = var("ROOMLEASE_METRICS").and_then(|val| val.parse().ok()) {
            self.metrics.enabled = enabled;
        }
        if let Some(port) = var("ROOMLEASE_METRICS_PORT").and_then(|val| val.parse().ok()) {
            self.metrics.port = port;
        }
        if let Some(filter) = var("ROOMLEASE_LOG") {
            self.logging.filter = filter;
        }
        if let Some(filter) = var("RUST_LOG") {
            self.logging.filter = filter;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus capacity must be non-zero".to_string(),
            ));
        }
        if self.bus.kind == BusKind::Mqtt {
            if self.bus.mqtt.broker_port == 0 {
                return Err(ConfigError::Validation(
                    "MQTT broker port must be non-zero".to_string(),
                ));
            }
            if self.bus.mqtt.keep_alive_secs < 5 {
                return Err(ConfigError::Validation(
                    "MQTT keep-alive must be at least 5 seconds".to_string(),
                ));
            }
            if self.bus.mqtt.channel_capacity == 0 {
                return Err(ConfigError::Validation(
                    "MQTT channel capacity must be non-zero".to_string(),
                ));
            }
        }
        if self.metrics.enabled && self.metrics.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "metrics host must not be empty".to_string(),
            ));
        }
        if self.simulation.enabled {
            self.simulation
                .validate()
                .map_err(|err| ConfigError::Validation(err.to_string()))?;
        }
        Ok(())
    }
}

/// Split `mqtt://host:port` (scheme and port optional) into its parts.
fn parse_broker_url(url: &str) -> Option<(String, Option<u16>)> {
    let rest = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url)
        .trim_end_matches('/');
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, Some(port.parse().ok()?)),
        None => (rest, None),
    };
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            kind: BusKind::default(),
            capacity: 1024,
            mqtt: MqttConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "roomleased=info,roomlease=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
