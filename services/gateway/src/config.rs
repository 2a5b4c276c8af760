//! Gateway configuration
//!
//! JSON file named by `EXCHANGE_CONFIG`; every field has a default, so a
//! missing variable runs the stock setup.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use matching_engine::EngineConfig;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "EXCHANGE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// How long a submitted task may run before the caller gets a task id
    pub wait_timeout_ms: u64,
    /// How long a status check waits for a running task
    pub poll_timeout_ms: u64,
    /// How long a finished result waits to be collected
    pub result_ttl_ms: u64,
    pub engine: EngineConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            wait_timeout_ms: 10_000,
            poll_timeout_ms: 500,
            result_ttl_ms: 300_000,
            engine: EngineConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_millis(self.result_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"wait_timeout_ms": 250, "engine": {"lock_wait_ms": 20}}"#).unwrap();
        assert_eq!(config.wait_timeout(), Duration::from_millis(250));
        assert_eq!(config.poll_timeout(), Duration::from_millis(500));
        assert_eq!(config.result_ttl(), Duration::from_secs(300));
        assert_eq!(config.engine.lock_wait_ms, 20);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(GatewayConfig::from_file(Path::new("/nonexistent/exchange.json")).is_err());
    }
}
