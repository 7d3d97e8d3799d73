use qualcel_core::audit::{SearchEvent, SearchEventId};

use super::{RepositoryError, SearchEventRepository};
use crate::DbPool;

pub struct SqlSearchEventRepository {
    pool: DbPool,
}

impl SqlSearchEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl SearchEventRepository for SqlSearchEventRepository {
    async fn record(&self, event: SearchEvent) -> Result<SearchEventId, RepositoryError> {
        let ai_criteria_json = event.ai_criteria.as_ref().map(to_json).transpose()?;

        sqlx::query(
            "INSERT INTO search_event (id, user_id, free_text, ui_selectors_json,
                                       ai_criteria_json, used_criteria_json,
                                       discarded_criteria_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id.0)
        .bind(event.user_id.as_ref().map(|id| id.0.as_str()))
        .bind(event.free_text.as_deref())
        .bind(to_json(&event.ui_selectors)?)
        .bind(ai_criteria_json)
        .bind(to_json(&event.used_criteria)?)
        .bind(to_json(&event.discarded_criteria)?)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(event.event_id)
    }
}
