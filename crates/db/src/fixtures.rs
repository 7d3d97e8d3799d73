use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Seed contract for the demo catalog. Must stay in sync with the SQL fixture.
const SEED_DEVICES: &[SeedDeviceContract] = &[
    SeedDeviceContract {
        id: "dev-galaxy-a55",
        model: "Galaxy A55 5G",
        characteristic_count: 9,
        aspect_count: 4,
    },
    SeedDeviceContract {
        id: "dev-galaxy-s24",
        model: "Galaxy S24",
        characteristic_count: 11,
        aspect_count: 4,
    },
    SeedDeviceContract {
        id: "dev-moto-g84",
        model: "Moto G84 5G",
        characteristic_count: 9,
        aspect_count: 4,
    },
    SeedDeviceContract {
        id: "dev-redmi-note-13",
        model: "Redmi Note 13",
        characteristic_count: 9,
        aspect_count: 4,
    },
    SeedDeviceContract {
        id: "dev-poco-x6-pro",
        model: "Poco X6 Pro",
        characteristic_count: 9,
        aspect_count: 4,
    },
    SeedDeviceContract {
        id: "dev-iphone-15",
        model: "iPhone 15",
        characteristic_count: 10,
        aspect_count: 4,
    },
];

/// Deterministic smartphone catalog with characteristics and opinion scores,
/// used for local runs and end-to-end checks.
pub struct DemoCatalog;

impl DemoCatalog {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let devices_seeded = SEED_DEVICES
            .iter()
            .map(|device| SeededDevice { id: device.id, model: device.model })
            .collect::<Vec<_>>();

        Ok(SeedResult { devices_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for device in SEED_DEVICES {
            let device_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM device WHERE id = ?1 AND model = ?2)",
            )
            .bind(device.id)
            .bind(device.model)
            .fetch_one(pool)
            .await?;
            checks.push((device.id, "device", device_ok == 1));

            let characteristics: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM device_characteristic WHERE device_id = ?1",
            )
            .bind(device.id)
            .fetch_one(pool)
            .await?;
            checks.push((
                device.id,
                "characteristics",
                characteristics == device.characteristic_count,
            ));

            let aspects: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM device_aspect_score
                 WHERE device_id = ?1 AND mean_score IS NOT NULL",
            )
            .bind(device.id)
            .fetch_one(pool)
            .await?;
            checks.push((device.id, "aspect-scores", aspects == device.aspect_count));
        }

        let all_present = checks.iter().all(|(_, _, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded devices and everything hanging off them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for device in SEED_DEVICES {
            sqlx::query("DELETE FROM search_result WHERE device_id = ?1")
                .bind(device.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM device WHERE id = ?1")
                .bind(device.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub fn device_count() -> usize {
        SEED_DEVICES.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedDeviceContract {
    id: &'static str,
    model: &'static str,
    characteristic_count: i64,
    aspect_count: i64,
}

#[derive(Debug)]
pub struct SeedResult {
    pub devices_seeded: Vec<SeededDevice>,
}

#[derive(Debug)]
pub struct SeededDevice {
    pub id: &'static str,
    pub model: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, &'static str, bool)>,
}
