use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{error, info, warn};

use qualcel_core::config::MAX_RANKED_RESULTS;
use qualcel_core::domain::criterion::Criterion;
use qualcel_core::domain::device::{AspectScoreRow, Device, DeviceId, ScoredDevice};
use qualcel_core::domain::history::{HistoryResult, NewHistoryRecord, SearchMetadata, UserId};
use qualcel_core::errors::ApplicationError;
use qualcel_db::repositories::{DeviceRepository, HistoryRepository};

use crate::ranking::{
    DevicePayload, RankingCriterion, RankingGateway, RankingRequest, ScoredEntry,
};

pub const DEFAULT_TOP_N: usize = MAX_RANKED_RESULTS;

/// Score assumed for an aspect whose stored mean is not a number.
const UNPARSEABLE_ASPECT_SCORE: f64 = 0.5;

pub struct MatchingFacade {
    devices: Arc<dyn DeviceRepository>,
    history: Arc<dyn HistoryRepository>,
    gateway: Arc<dyn RankingGateway>,
    top_n: usize,
}

impl MatchingFacade {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        history: Arc<dyn HistoryRepository>,
        gateway: Arc<dyn RankingGateway>,
    ) -> Self {
        Self { devices, history, gateway, top_n: DEFAULT_TOP_N }
    }

    /// Narrows the result list. Never widens it past [`DEFAULT_TOP_N`].
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.clamp(1, DEFAULT_TOP_N);
        self
    }

    /// Ranks the whole catalog against `criteria` through the ranking service.
    ///
    /// Blank criteria short-circuit to an empty list before any I/O. A ranking
    /// service that cannot rank is a hard [`ApplicationError::RankingUnavailable`];
    /// history persistence is best-effort.
    pub async fn find_matches(
        &self,
        criteria: &[Criterion],
        user_id: Option<&UserId>,
        metadata: Option<&SearchMetadata>,
    ) -> Result<Vec<ScoredDevice>, ApplicationError> {
        let sanitized: Vec<RankingCriterion> = criteria
            .iter()
            .filter_map(Criterion::normalized)
            .map(|c| RankingCriterion::from(&c))
            .collect();
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let devices = self.devices.list_with_characteristics().await?;
        if devices.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<DeviceId> = devices.iter().map(|device| device.id.clone()).collect();
        let aspect_scores = build_aspect_score_map(&self.devices.aspect_scores(&ids).await?);

        let request = RankingRequest {
            criterios: sanitized,
            dispositivos: build_device_payloads(&devices, &aspect_scores),
        };

        let scores = match self.gateway.score_devices(&request).await {
            Some(scores) if !scores.is_empty() => scores,
            _ => {
                error!(
                    event_name = "agent.matching.ranking_unavailable",
                    device_count = request.dispositivos.len(),
                    "ranking service returned no scores"
                );
                return Err(ApplicationError::RankingUnavailable);
            }
        };

        let mut ranked = map_scores_to_devices(scores, devices);
        ranked.truncate(self.top_n);
        info!(event_name = "agent.matching.ranked", results = ranked.len(), "catalog ranked");

        match user_id {
            Some(user_id) if !ranked.is_empty() => {
                Ok(self.attach_history(ranked, criteria, user_id, metadata).await)
            }
            _ => Ok(ranked),
        }
    }

    async fn attach_history(
        &self,
        ranked: Vec<ScoredDevice>,
        criteria: &[Criterion],
        user_id: &UserId,
        metadata: Option<&SearchMetadata>,
    ) -> Vec<ScoredDevice> {
        let console_input = metadata
            .and_then(|metadata| metadata.console_input.clone())
            .filter(|text| !text.trim().is_empty())
            .or_else(|| {
                criteria
                    .iter()
                    .find(|criterion| criterion.is_free_text())
                    .map(|criterion| criterion.description.clone())
            });

        let record = NewHistoryRecord {
            user_id: user_id.clone(),
            criteria: criteria.to_vec(),
            console_input,
            selectors: metadata.map(|metadata| metadata.selectors.clone()).unwrap_or_default(),
            event_id: metadata.and_then(|metadata| metadata.event_id.clone()),
            results: ranked
                .iter()
                .map(|scored| HistoryResult {
                    device_id: scored.device.id.clone(),
                    match_score: scored.match_score,
                    justifications: scored.justifications.clone(),
                })
                .collect(),
        };

        match self.history.save(record).await {
            Ok(history_id) => ranked
                .into_iter()
                .map(|mut scored| {
                    scored.history_id = Some(history_id.clone());
                    scored
                })
                .collect(),
            Err(err) => {
                warn!(
                    event_name = "agent.matching.history_write_failed",
                    user_id = %user_id.0,
                    error = %err,
                    "failed to save search history"
                );
                ranked
            }
        }
    }
}

/// Brings a stored mean onto 0..1: values above 1 are read as a 0..5 scale.
pub fn normalize_aspect_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return UNPARSEABLE_ASPECT_SCORE;
    }
    let scaled = if raw > 1.0 { raw / 5.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

/// Per device, lowercased aspect label to normalized score. Rows without a
/// mean or without a label are skipped.
pub fn build_aspect_score_map(
    rows: &[AspectScoreRow],
) -> HashMap<DeviceId, BTreeMap<String, f64>> {
    rows.iter().fold(HashMap::new(), |mut map, row| {
        let aspect = row.aspect.trim().to_lowercase();
        let Some(mean) = row.mean_score.filter(|_| !aspect.is_empty()) else {
            return map;
        };
        map.entry(row.device_id.clone())
            .or_insert_with(BTreeMap::new)
            .insert(aspect, normalize_aspect_score(mean));
        map
    })
}

pub fn build_device_payloads(
    devices: &[Device],
    aspect_scores: &HashMap<DeviceId, BTreeMap<String, f64>>,
) -> Vec<DevicePayload> {
    devices
        .iter()
        .map(|device| {
            let scores = aspect_scores
                .get(&device.id)
                .map(|scores| {
                    scores
                        .iter()
                        .filter(|(_, score)| score.is_finite())
                        .map(|(aspect, score)| (aspect.clone(), *score))
                        .collect::<BTreeMap<_, _>>()
                })
                .filter(|scores| !scores.is_empty());

            DevicePayload {
                id: device.id.0.clone(),
                preco: device.price.filter(|price| price.is_finite()),
                caracteristicas: device
                    .characteristics
                    .iter()
                    .filter_map(Criterion::normalized)
                    .map(|c| RankingCriterion::from(&c))
                    .collect(),
                aspect_scores: scores,
            }
        })
        .collect()
}

/// Keeps the ranking service's order; scores for unknown ids are dropped.
pub fn map_scores_to_devices(
    scores: Vec<ScoredEntry>,
    devices: Vec<Device>,
) -> Vec<ScoredDevice> {
    let catalog: HashMap<String, Device> =
        devices.into_iter().map(|device| (device.id.0.clone(), device)).collect();

    scores
        .into_iter()
        .filter_map(|entry| {
            let device = catalog.get(&entry.id)?.clone();
            Some(ScoredDevice {
                device,
                match_score: entry.match_score,
                profile_match_percent: entry.profile_match_percent,
                criteria_match_percent: entry.criteria_match_percent.filter(|v| v.is_finite()),
                match_explanation: entry.match_explanation,
                justifications: entry.justifications,
                history_id: None,
            })
        })
        .collect()
}
