//! Global configuration schema for GridFlow.
//!
//! Deserialized from `config.toml` by `gridflow-infra::config`. Every field
//! has a default so a missing or partial file still yields a usable config.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub webhooks: WebhookConfig,
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Broadcast channel capacity for the engine event bus.
    pub event_bus_capacity: usize,
}

/// Webhook dispatch tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Maximum retained fired events (oldest evicted first).
    pub event_history_limit: usize,
    /// Per-delivery HTTP timeout in seconds.
    pub delivery_timeout_secs: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            webhooks: WebhookConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: 1024,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            event_history_limit: 100,
            delivery_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = GridConfig::default();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.engine.event_bus_capacity, 1024);
        assert_eq!(config.webhooks.event_history_limit, 100);
        assert_eq!(config.webhooks.delivery_timeout_secs, 30);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: GridConfig = serde_json::from_value(serde_json::json!({
            "server": { "port": 9000 }
        }))
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.webhooks.event_history_limit, 100);
    }
}
