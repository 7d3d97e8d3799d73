use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};

use qualcel_core::domain::criterion::Criterion;
use qualcel_core::domain::device::{AspectScoreRow, Device, DeviceId};

use super::{DeviceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDeviceRepository {
    pool: DbPool,
}

impl SqlDeviceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_device(row: &sqlx::sqlite::SqliteRow) -> Result<Device, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let manufacturer: String = row.try_get("manufacturer").map_err(decode_err)?;
    let model: String = row.try_get("model").map_err(decode_err)?;
    let price: Option<f64> = row.try_get("price").map_err(decode_err)?;
    let photos_json: String = row.try_get("photos_json").map_err(decode_err)?;
    let photos: Vec<String> = serde_json::from_str(&photos_json).map_err(decode_err)?;

    Ok(Device {
        id: DeviceId(id),
        manufacturer,
        model,
        price,
        photos,
        characteristics: Vec::new(),
    })
}

#[async_trait::async_trait]
impl DeviceRepository for SqlDeviceRepository {
    async fn list_with_characteristics(&self) -> Result<Vec<Device>, RepositoryError> {
        let device_rows = sqlx::query(
            "SELECT id, manufacturer, model, price, photos_json FROM device ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut devices = device_rows.iter().map(row_to_device).collect::<Result<Vec<_>, _>>()?;

        let characteristic_rows = sqlx::query(
            "SELECT device_id, kind, description
             FROM device_characteristic
             ORDER BY device_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_device: HashMap<String, Vec<Criterion>> = HashMap::new();
        for row in &characteristic_rows {
            let device_id: String = row.try_get("device_id").map_err(decode_err)?;
            let kind: String = row.try_get("kind").map_err(decode_err)?;
            let description: String = row.try_get("description").map_err(decode_err)?;
            by_device.entry(device_id).or_default().push(Criterion::new(kind, description));
        }

        for device in &mut devices {
            device.characteristics = by_device.remove(&device.id.0).unwrap_or_default();
        }

        Ok(devices)
    }

    async fn aspect_scores(
        &self,
        device_ids: &[DeviceId],
    ) -> Result<Vec<AspectScoreRow>, RepositoryError> {
        if device_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT device_id, aspect, mean_score FROM device_aspect_score WHERE device_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in device_ids {
            separated.push_bind(id.0.as_str());
        }
        separated.push_unseparated(") ORDER BY device_id, aspect");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let device_id: String = row.try_get("device_id").map_err(decode_err)?;
                let aspect: String = row.try_get("aspect").map_err(decode_err)?;
                let mean_score: Option<f64> = row.try_get("mean_score").map_err(decode_err)?;
                Ok(AspectScoreRow { device_id: DeviceId(device_id), aspect, mean_score })
            })
            .collect()
    }

    async fn save(&self, device: Device) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let photos_json = serde_json::to_string(&device.photos).map_err(decode_err)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO device (id, manufacturer, model, price, photos_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 manufacturer = excluded.manufacturer,
                 model = excluded.model,
                 price = excluded.price,
                 photos_json = excluded.photos_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&device.id.0)
        .bind(&device.manufacturer)
        .bind(&device.model)
        .bind(device.price)
        .bind(&photos_json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM device_characteristic WHERE device_id = ?")
            .bind(&device.id.0)
            .execute(&mut *tx)
            .await?;

        for (position, characteristic) in device.characteristics.iter().enumerate() {
            sqlx::query(
                "INSERT INTO device_characteristic (device_id, position, kind, description)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&device.id.0)
            .bind(position as i64)
            .bind(&characteristic.kind)
            .bind(&characteristic.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_aspect_score(&self, row: AspectScoreRow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO device_aspect_score (device_id, aspect, mean_score, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(device_id, aspect) DO UPDATE SET
                 mean_score = excluded.mean_score,
                 updated_at = excluded.updated_at",
        )
        .bind(&row.device_id.0)
        .bind(&row.aspect)
        .bind(row.mean_score)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
