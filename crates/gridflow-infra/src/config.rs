//! Configuration loader for GridFlow.
//!
//! Reads `config.toml` from the given directory and deserializes it into
//! [`GridConfig`]. Falls back to defaults when the file is missing or
//! malformed; a bad config file must never stop the engine from starting.

use std::path::Path;

use gridflow_types::config::GridConfig;

/// Load configuration from `{dir}/config.toml`.
///
/// - Missing file: returns [`GridConfig::default()`] quietly.
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_config(dir: &Path) -> GridConfig {
    let config_path = dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GridConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GridConfig::default();
        }
    };

    match toml::from_str::<GridConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GridConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.webhooks.event_history_limit, 100);
    }

    #[tokio::test]
    async fn valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
host = "0.0.0.0"
port = 9100

[webhooks]
event_history_limit = 250
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.webhooks.event_history_limit, 250);
        // untouched section keeps its default
        assert_eq!(config.engine.event_bus_capacity, 1024);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.webhooks.delivery_timeout_secs, 30);
    }
}
