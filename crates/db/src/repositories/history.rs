use chrono::Utc;
use uuid::Uuid;

use qualcel_core::domain::history::{HistoryId, NewHistoryRecord};

use super::{HistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHistoryRepository {
    pool: DbPool,
}

impl SqlHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryRepository for SqlHistoryRepository {
    async fn save(&self, record: NewHistoryRecord) -> Result<HistoryId, RepositoryError> {
        let history_id = HistoryId(Uuid::new_v4().to_string());
        let criteria_json = serde_json::to_string(&record.criteria)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let selectors_json = serde_json::to_string(&record.selectors)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO search_history (id, user_id, criteria_json, console_input,
                                         selectors_json, event_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&history_id.0)
        .bind(&record.user_id.0)
        .bind(&criteria_json)
        .bind(record.console_input.as_deref())
        .bind(&selectors_json)
        .bind(record.event_id.as_ref().map(|id| id.0.as_str()))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (position, result) in record.results.iter().enumerate() {
            let justifications_json = serde_json::to_string(&result.justifications)
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            sqlx::query(
                "INSERT INTO search_result (history_id, position, device_id, match_score,
                                            justifications_json)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&history_id.0)
            .bind(position as i64)
            .bind(&result.device_id.0)
            .bind(result.match_score)
            .bind(&justifications_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(history_id)
    }
}
