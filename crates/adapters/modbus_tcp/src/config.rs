//! Modbus/TCP relay configuration.

use std::time::Duration;

use serde::Deserialize;

/// Where the relay box listens and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Relay box hostname or IP address.
    pub host: String,
    /// Modbus/TCP port.
    pub port: u16,
    /// Unit identifier placed in every MBAP header.
    pub unit_id: u8,
    /// Connect and per-request timeout, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.254".to_string(),
            port: 502,
            unit_id: 1,
            timeout_ms: 1_000,
        }
    }
}

impl ModbusConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = ModbusConfig::default();
        assert_eq!(config.address(), "192.168.1.254:502");
        assert_eq!(config.unit_id, 1);
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: ModbusConfig = toml::from_str(r#"host = "10.0.0.7""#).unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, 502);
        assert_eq!(config.timeout_ms, 1_000);
    }
}
