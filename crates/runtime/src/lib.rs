use anyhow::Result;
use harvestchat_config::AppConfig;
use harvestchat_database::initialize_database;
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Process-wide services, wired from configuration at startup.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;
        info!(url = %config.database.url, "database ready");

        Ok(Self { db_pool })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestchat_config::DatabaseConfig;

    #[tokio::test]
    async fn services_initialise_against_a_fresh_database() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            database: DatabaseConfig {
                url: format!("sqlite://{}", tmp.path().join("runtime.db").display()),
                max_connections: 1,
            },
            ..AppConfig::default()
        };

        let services = BackendServices::initialise(&config).await.unwrap();
        assert!(!services.db_pool.is_closed());
    }
}
