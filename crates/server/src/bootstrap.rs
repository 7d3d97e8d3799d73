use std::sync::Arc;

use qualcel_agent::llm::{GeminiClient, LlmClient};
use qualcel_agent::{ConversationalFacade, HttpRankingGateway, LlmOrchestrator, MatchingFacade};
use qualcel_core::config::{AppConfig, ConfigError, LoadOptions};
use qualcel_db::repositories::{
    SqlDeviceRepository, SqlHistoryRepository, SqlSearchEventRepository,
};
use qualcel_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub facade: Arc<ConversationalFacade>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client setup failed: {0}")]
    HttpClient(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let facade = build_facade(&config, &db_pool)?;

    Ok(Application { config, db_pool, facade: Arc::new(facade) })
}

fn build_facade(config: &AppConfig, pool: &DbPool) -> Result<ConversationalFacade, BootstrapError> {
    let llm = if config.llm_enabled() {
        let client = GeminiClient::from_config(&config.llm).map_err(BootstrapError::HttpClient)?;
        Some(Arc::new(client) as Arc<dyn LlmClient>)
    } else {
        None
    };
    info!(
        event_name = "system.bootstrap.llm_mode",
        correlation_id = "bootstrap",
        llm_mode = config.llm_mode(),
        "generative ai mode resolved"
    );

    let gateway =
        HttpRankingGateway::from_config(&config.ranking).map_err(BootstrapError::HttpClient)?;
    let matching = MatchingFacade::new(
        Arc::new(SqlDeviceRepository::new(pool.clone())),
        Arc::new(SqlHistoryRepository::new(pool.clone())),
        Arc::new(gateway),
    )
    .with_top_n(config.ranking.top_n);

    Ok(ConversationalFacade::new(
        Arc::new(LlmOrchestrator::from_client(llm)),
        Arc::new(SqlSearchEventRepository::new(pool.clone())),
        Arc::new(matching),
    ))
}

#[cfg(test)]
mod tests {
    use qualcel_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..overrides
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_gemini_has_no_key() {
        let result = bootstrap(options(ConfigOverrides {
            llm_provider: Some(LlmProvider::Gemini),
            llm_api_key: Some("   ".to_string()),
            ..ConfigOverrides::default()
        }))
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("llm.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_builds_the_gemini_client_when_a_key_is_set() {
        let app = bootstrap(options(ConfigOverrides {
            llm_provider: Some(LlmProvider::Gemini),
            llm_api_key: Some("AIza-test-key".to_string()),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed with a gemini key");

        assert!(app.config.llm_enabled());
        assert_eq!(app.config.llm_mode(), "gemini");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_pipeline() {
        let app = bootstrap(options(ConfigOverrides {
            llm_provider: Some(LlmProvider::Disabled),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed with an in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('device', 'search_event', 'search_history')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables should exist after bootstrap");
        assert_eq!(table_count, 3);
        assert_eq!(app.config.ranking.top_n, 3);
        assert_eq!(app.config.llm_mode(), "disabled");

        app.db_pool.close().await;
    }
}
