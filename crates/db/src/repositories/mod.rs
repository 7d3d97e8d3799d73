use async_trait::async_trait;
use thiserror::Error;

use qualcel_core::audit::{SearchEvent, SearchEventId};
use qualcel_core::domain::device::{AspectScoreRow, Device, DeviceId};
use qualcel_core::domain::history::{HistoryId, NewHistoryRecord};
use qualcel_core::errors::ApplicationError;

pub mod device;
pub mod history;
pub mod memory;
pub mod search_event;

pub use device::SqlDeviceRepository;
pub use history::SqlHistoryRepository;
pub use memory::{
    InMemoryDeviceRepository, InMemoryHistoryRepository, InMemorySearchEventRepository,
};
pub use search_event::SqlSearchEventRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Read side of the device catalog. Filtering is left to the ranking service,
/// so there is no query by criteria here.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Every device with its characteristics, ordered by device id.
    async fn list_with_characteristics(&self) -> Result<Vec<Device>, RepositoryError>;

    async fn aspect_scores(
        &self,
        device_ids: &[DeviceId],
    ) -> Result<Vec<AspectScoreRow>, RepositoryError>;

    /// Upserts the device and replaces its characteristics.
    async fn save(&self, device: Device) -> Result<(), RepositoryError>;

    async fn save_aspect_score(&self, row: AspectScoreRow) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SearchEventRepository: Send + Sync {
    async fn record(&self, event: SearchEvent) -> Result<SearchEventId, RepositoryError>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Stores the header and one result row per device atomically.
    async fn save(&self, record: NewHistoryRecord) -> Result<HistoryId, RepositoryError>;
}
