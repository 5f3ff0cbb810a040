use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "harvestchat.toml",
    "config/harvestchat.toml",
    "crates/config/harvestchat.toml",
    "../harvestchat.toml",
    "../config/harvestchat.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://harvestchat.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Tuning knobs for the realtime chat core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Buffered events per conversation channel before slow subscribers lag.
    #[serde(default = "ChatConfig::default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl ChatConfig {
    const fn default_broadcast_capacity() -> usize {
        100
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: Self::default_broadcast_capacity(),
        }
    }
}

/// Load the application configuration by combining defaults, an optional
/// TOML file, and `HARVESTCHAT`-prefixed environment overrides.
///
/// The file is taken from `HARVESTCHAT_CONFIG` when set, otherwise the first
/// existing candidate relative to the working directory is used.
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default(
            "chat.broadcast_capacity",
            i64::try_from(defaults.chat.broadcast_capacity).unwrap_or(i64::MAX),
        )
        .unwrap();

    if let Ok(path) = std::env::var("HARVESTCHAT_CONFIG") {
        debug!(path, "loading configuration via HARVESTCHAT_CONFIG");
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
        } else {
            debug!("no configuration file found, relying on defaults and environment overrides");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HARVESTCHAT")
            .prefix_separator("_")
            .separator("__"),
    );

    let cfg = builder.build().context("unable to build configuration")?;
    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_file_or_env() {
        std::env::remove_var("HARVESTCHAT_CONFIG");
        std::env::remove_var("HARVESTCHAT_HTTP__PORT");

        let config = load().unwrap();
        assert_eq!(config.http.address, "127.0.0.1");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.chat.broadcast_capacity, 100);
    }

    #[test]
    #[serial]
    fn environment_overrides_take_precedence() {
        std::env::remove_var("HARVESTCHAT_CONFIG");
        std::env::set_var("HARVESTCHAT_HTTP__PORT", "9100");

        let config = load().unwrap();
        assert_eq!(config.http.port, 9100);

        std::env::remove_var("HARVESTCHAT_HTTP__PORT");
    }

    #[test]
    #[serial]
    fn config_file_is_read_when_pointed_at() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvestchat.toml");
        std::fs::write(
            &path,
            "[database]\nurl = \"sqlite://:memory:\"\nmax_connections = 3\n",
        )
        .unwrap();

        std::env::set_var("HARVESTCHAT_CONFIG", &path);
        let config = load().unwrap();
        std::env::remove_var("HARVESTCHAT_CONFIG");

        assert_eq!(config.database.url, "sqlite://:memory:");
        assert_eq!(config.database.max_connections, 3);
    }
}
