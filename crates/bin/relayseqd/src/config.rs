//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `relayseq.toml` in the working directory, or the file named by
//! `RELAYSEQ_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use relayseq_adapter_modbus_tcp::ModbusConfig;
use serde::Deserialize;

const DEFAULT_PATH: &str = "relayseq.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which relay implementation to drive.
    pub device: DeviceConfig,
    /// Modbus/TCP relay box settings.
    pub relay: ModbusConfig,
    /// Tick loop settings.
    pub poll: PollConfig,
    /// Rule file settings.
    pub rules: RulesConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Modbus,
    Virtual,
}

impl std::str::FromStr for DeviceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "modbus" => Ok(Self::Modbus),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown device kind `{other}` (expected modbus or virtual)"
            ))),
        }
    }
}

/// Relay selection and the virtual board's scripted inputs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    /// Input masks replayed in a loop by the virtual board.
    pub demo_inputs: Vec<u8>,
    /// How long each demo mask is held, in milliseconds.
    pub demo_period_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path of the JSON rule file.
    pub path: PathBuf,
    /// Write the rule set back to the file on shutdown.
    pub save_on_exit: bool,
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
        let path = std::env::var("RELAYSEQ_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
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

    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("RELAYSEQ_DEVICE") {
            self.device.kind = val.parse()?;
        }
        if let Some(val) = var("RELAYSEQ_RELAY_HOST") {
            self.relay.host = val;
        }
        if let Some(port) = var("RELAYSEQ_RELAY_PORT").and_then(|val| val.parse().ok()) {
            self.relay.port = port;
        }
        if let Some(interval) = var("RELAYSEQ_POLL_MS").and_then(|val| val.parse().ok()) {
            self.poll.interval_ms = interval;
        }
        if let Some(val) = var("RELAYSEQ_RULES") {
            self.rules.path = PathBuf::from(val);
        }
        if let Some(val) = var("RELAYSEQ_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.device.kind == DeviceKind::Modbus {
            if self.relay.port == 0 {
                return Err(ConfigError::Validation(
                    "relay port must be non-zero".to_string(),
                ));
            }
            if self.relay.timeout_ms == 0 {
                return Err(ConfigError::Validation(
                    "relay timeout must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    #[must_use]
    pub const fn demo_period(&self) -> Duration {
        Duration::from_millis(self.device.demo_period_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::default(),
            demo_inputs: Vec::new(),
            demo_period_ms: 2_000,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 250 }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sequences.json"),
            save_on_exit: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "relayseqd=info,relayseq=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("malformed config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("cannot read config file")]
    Io(#[from] std::io::Error),
    /// A value is out of range or unknown.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
