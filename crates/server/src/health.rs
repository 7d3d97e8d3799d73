use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use qualcel_core::config::AppConfig;
use qualcel_db::DbPool;
use serde::Serialize;
use tracing::warn;

/// The catalog pool plus the integration settings the pipeline was wired with.
#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    llm_mode: &'static str,
    ranking_url: String,
}

impl HealthState {
    pub fn new(db_pool: DbPool, config: &AppConfig) -> Self {
        Self { db_pool, llm_mode: config.llm_mode(), ranking_url: config.ranking.url.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCheck {
    pub status: &'static str,
    pub device_count: i64,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog: CatalogCheck,
    pub llm_mode: &'static str,
    pub ranking_url: String,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Ready only when the device catalog can be read and holds at least one device.
/// The ranking service is reported, not called.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.db_pool).await;
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        catalog,
        llm_mode: state.llm_mode,
        ranking_url: state.ranking_url,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn catalog_check(pool: &DbPool) -> CatalogCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM device").fetch_one(pool).await {
        Ok(0) => {
            warn!(
                event_name = "system.health.catalog_empty",
                "device catalog has no devices"
            );
            CatalogCheck {
                status: "empty",
                device_count: 0,
                detail: "device catalog is empty; run `qualcel seed`".to_string(),
            }
        }
        Ok(count) => CatalogCheck {
            status: "ready",
            device_count: count,
            detail: format!("{count} devices available for ranking"),
        },
        Err(error) => {
            warn!(
                event_name = "system.health.catalog_unavailable",
                error = %error,
                "device catalog query failed"
            );
            CatalogCheck {
                status: "unavailable",
                device_count: 0,
                detail: format!("device catalog query failed: {error}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use qualcel_core::config::{AppConfig, LlmProvider};
    use qualcel_db::{connect_with_settings, migrations, DbPool, DemoCatalog};
    use secrecy::SecretString;

    use crate::health::{health, HealthState};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn seeded_catalog_is_ready_and_reports_integrations() {
        let pool = migrated_pool().await;
        DemoCatalog::load(&pool).await.expect("seed");
        let config = AppConfig::default();

        let (status, Json(payload)) = health(State(HealthState::new(pool.clone(), &config))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.status, "ready");
        assert_eq!(payload.catalog.device_count, DemoCatalog::device_count() as i64);
        assert_eq!(payload.llm_mode, "disabled");
        assert_eq!(payload.ranking_url, "http://127.0.0.1:8000/ml/score-dispositivos");

        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["catalog"]["deviceCount"], 6);
        assert_eq!(json["llmMode"], "disabled");

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_catalog_is_not_ready() {
        let pool = migrated_pool().await;

        let (status, Json(payload)) =
            health(State(HealthState::new(pool.clone(), &AppConfig::default()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "empty");
        assert_eq!(payload.catalog.device_count, 0);

        pool.close().await;
    }

    #[tokio::test]
    async fn unreachable_catalog_is_unavailable() {
        let pool = migrated_pool().await;
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState::new(pool, &AppConfig::default()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.catalog.status, "unavailable");
        assert!(payload.catalog.detail.starts_with("device catalog query failed"));
    }

    #[tokio::test]
    async fn gemini_mode_and_custom_ranking_url_are_reported() {
        let pool = migrated_pool().await;
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Gemini;
        config.llm.api_key = Some(SecretString::from("AIza-test".to_string()));
        config.ranking.url = "http://ranker.internal/score".to_string();

        let (_, Json(payload)) = health(State(HealthState::new(pool.clone(), &config))).await;

        assert_eq!(payload.llm_mode, "gemini");
        assert_eq!(payload.ranking_url, "http://ranker.internal/score");

        pool.close().await;
    }
}
