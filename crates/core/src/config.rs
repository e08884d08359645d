use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

/// Driver-facing channel settings (the WebSocket leg the external driver
/// speaks to us over).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    #[serde(default = "default_driver_url")]
    pub url: String,
    /// Fixed delay between reconnect attempts after the driver leg closes.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_driver_url() -> String {
    "ws://localhost:8765".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: default_driver_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Agent-facing channel settings (the second hop into the page).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Endpoint the page-agent hub listens on; empty disables the leg.
    #[serde(default = "default_agent_url")]
    pub url: String,
    /// First reconnect delay; doubles on each consecutive failure.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Attempts before the agent leg gives up until externally reset.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// How long a forwarded request waits for the page agent to answer.
    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,
}

fn default_agent_url() -> String {
    "ws://localhost:8766".to_string()
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    6
}

fn default_forward_timeout_ms() -> u64 {
    10000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            url: default_agent_url(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_attempts: default_max_attempts(),
            forward_timeout_ms: default_forward_timeout_ms(),
        }
    }
}

/// Polling-loop settings shared by the wait commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitConfig {
    #[serde(default = "default_wait_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_wait_timeout_ms() -> u64 {
    10000
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_wait_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Where to find the browser's debugging endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    #[serde(default = "default_cdp_host")]
    pub cdp_host: String,
    #[serde(default = "default_cdp_port")]
    pub cdp_port: u16,
}

fn default_cdp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_cdp_port() -> u16 {
    9222
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cdp_host: default_cdp_host(),
            cdp_port: default_cdp_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.driver.url, "ws://localhost:8765");
        assert_eq!(config.driver.reconnect_delay_ms, 5000);
        assert_eq!(config.wait.default_timeout_ms, 10000);
        assert_eq!(config.wait.poll_interval_ms, 100);
        assert_eq!(config.agent.max_attempts, 6);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"driver":{"url":"ws://10.0.0.2:9000"}}"#).unwrap();
        assert_eq!(config.driver.url, "ws://10.0.0.2:9000");
        assert_eq!(config.driver.reconnect_delay_ms, 5000);
        assert_eq!(config.browser.cdp_port, 9222);
    }
}
