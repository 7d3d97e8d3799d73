use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;
use uuid::Uuid;

use qualcel_core::audit::{SearchEvent, SearchEventId};
use qualcel_core::domain::device::{AspectScoreRow, Device, DeviceId};
use qualcel_core::domain::history::{HistoryId, NewHistoryRecord};

use super::{DeviceRepository, HistoryRepository, RepositoryError, SearchEventRepository};

fn injected_failure(what: &str) -> RepositoryError {
    RepositoryError::Decode(format!("injected failure: {what}"))
}

/// Catalog kept in a sorted map so listing order matches the SQL repository.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<BTreeMap<String, Device>>,
    aspect_scores: RwLock<HashMap<(String, String), Option<f64>>>,
    reads: AtomicUsize,
}

impl InMemoryDeviceRepository {
    /// Number of catalog reads served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn list_with_characteristics(&self) -> Result<Vec<Device>, RepositoryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let devices = self.devices.read().await;
        Ok(devices.values().cloned().collect())
    }

    async fn aspect_scores(
        &self,
        device_ids: &[DeviceId],
    ) -> Result<Vec<AspectScoreRow>, RepositoryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let scores = self.aspect_scores.read().await;
        let mut rows: Vec<AspectScoreRow> = scores
            .iter()
            .filter(|((device_id, _), _)| device_ids.iter().any(|id| &id.0 == device_id))
            .map(|((device_id, aspect), mean_score)| AspectScoreRow {
                device_id: DeviceId(device_id.clone()),
                aspect: aspect.clone(),
                mean_score: *mean_score,
            })
            .collect();
        rows.sort_by(|a, b| (&a.device_id, &a.aspect).cmp(&(&b.device_id, &b.aspect)));
        Ok(rows)
    }

    async fn save(&self, device: Device) -> Result<(), RepositoryError> {
        let mut devices = self.devices.write().await;
        devices.insert(device.id.0.clone(), device);
        Ok(())
    }

    async fn save_aspect_score(&self, row: AspectScoreRow) -> Result<(), RepositoryError> {
        let mut scores = self.aspect_scores.write().await;
        scores.insert((row.device_id.0, row.aspect), row.mean_score);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySearchEventRepository {
    events: RwLock<Vec<SearchEvent>>,
    fail_writes: AtomicBool,
}

impl InMemorySearchEventRepository {
    pub fn failing() -> Self {
        Self { fail_writes: AtomicBool::new(true), ..Self::default() }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<SearchEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl SearchEventRepository for InMemorySearchEventRepository {
    async fn record(&self, event: SearchEvent) -> Result<SearchEventId, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure("search event write"));
        }
        let id = event.event_id.clone();
        self.events.write().await.push(event);
        Ok(id)
    }
}

#[derive(Default)]
pub struct InMemoryHistoryRepository {
    records: RwLock<Vec<(HistoryId, NewHistoryRecord)>>,
    fail_writes: AtomicBool,
}

impl InMemoryHistoryRepository {
    pub fn failing() -> Self {
        Self { fail_writes: AtomicBool::new(true), ..Self::default() }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<(HistoryId, NewHistoryRecord)> {
        self.records.read().await.clone()
    }
}

#[async_trait::async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn save(&self, record: NewHistoryRecord) -> Result<HistoryId, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure("history write"));
        }
        let id = HistoryId(Uuid::new_v4().to_string());
        self.records.write().await.push((id.clone(), record));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use qualcel_core::audit::SearchEvent;
    use qualcel_core::domain::criterion::Criterion;
    use qualcel_core::domain::device::{AspectScoreRow, Device, DeviceId};
    use qualcel_core::domain::history::{NewHistoryRecord, UserId};
    use qualcel_core::domain::selectors::SelectorMap;

    use crate::repositories::{
        DeviceRepository, HistoryRepository, InMemoryDeviceRepository, InMemoryHistoryRepository,
        InMemorySearchEventRepository, SearchEventRepository,
    };

    fn device(id: &str) -> Device {
        Device {
            id: DeviceId(id.to_string()),
            manufacturer: "Motorola".to_string(),
            model: "Moto G".to_string(),
            price: Some(999.0),
            photos: Vec::new(),
            characteristics: vec![Criterion::new("ram", "4")],
        }
    }

    #[tokio::test]
    async fn in_memory_device_repo_lists_in_id_order_and_counts_reads() {
        let repo = InMemoryDeviceRepository::default();
        repo.save(device("dev-2")).await.expect("save 2");
        repo.save(device("dev-1")).await.expect("save 1");
        repo.save_aspect_score(AspectScoreRow {
            device_id: DeviceId("dev-1".to_string()),
            aspect: "camera".to_string(),
            mean_score: Some(3.5),
        })
        .await
        .expect("save score");

        let devices = repo.list_with_characteristics().await.expect("list");
        let scores = repo.aspect_scores(&[DeviceId("dev-1".to_string())]).await.expect("scores");

        assert_eq!(devices[0].id.0, "dev-1");
        assert_eq!(scores.len(), 1);
        assert_eq!(repo.read_count(), 2);
    }

    #[tokio::test]
    async fn in_memory_search_event_repo_supports_failure_injection() {
        let repo = InMemorySearchEventRepository::default();
        let event = SearchEvent::new(None, SelectorMap::default());

        let id = repo.record(event.clone()).await.expect("record");
        assert_eq!(id, event.event_id);

        repo.set_failing(true);
        assert!(repo.record(SearchEvent::new(None, SelectorMap::default())).await.is_err());
        assert_eq!(repo.events().await.len(), 1);
    }

    #[tokio::test]
    async fn in_memory_history_repo_assigns_ids() {
        let repo = InMemoryHistoryRepository::default();
        let record = NewHistoryRecord {
            user_id: UserId("user-1".to_string()),
            criteria: Vec::new(),
            console_input: None,
            selectors: SelectorMap::default(),
            event_id: None,
            results: Vec::new(),
        };

        let first = repo.save(record.clone()).await.expect("save 1");
        let second = repo.save(record).await.expect("save 2");

        assert_ne!(first, second);
        assert_eq!(repo.records().await.len(), 2);
        assert!(InMemoryHistoryRepository::failing()
            .save(repo.records().await[0].1.clone())
            .await
            .is_err());
    }
}
