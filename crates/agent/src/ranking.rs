use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

use qualcel_core::config::RankingConfig;
use qualcel_core::domain::criterion::Criterion;
use qualcel_core::domain::device::MatchExplanation;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingCriterion {
    pub tipo: String,
    pub descricao: String,
}

impl From<&Criterion> for RankingCriterion {
    fn from(criterion: &Criterion) -> Self {
        Self { tipo: criterion.kind.clone(), descricao: criterion.description.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DevicePayload {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preco: Option<f64>,
    pub caracteristicas: Vec<RankingCriterion>,
    /// Aspect label (`camera`, `bateria`, `preco`, `desempenho`) to a 0..1 score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_scores: Option<BTreeMap<String, f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankingRequest {
    pub criterios: Vec<RankingCriterion>,
    pub dispositivos: Vec<DevicePayload>,
}

/// One device verdict, in the order the ranking service ranked them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredEntry {
    pub id: String,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub match_score: f64,
    #[serde(default, rename = "perfilMatchPercent")]
    pub profile_match_percent: f64,
    #[serde(default, rename = "criteriosMatchPercent")]
    pub criteria_match_percent: Option<f64>,
    #[serde(default)]
    pub spec_fit: Option<f64>,
    #[serde(default)]
    pub opinion_sim: Option<f64>,
    #[serde(default, rename = "justificativas")]
    pub justifications: Vec<String>,
    #[serde(default)]
    pub match_explanation: MatchExplanation,
}

#[derive(Debug, Deserialize)]
struct ScoresEnvelope {
    scores: Option<Vec<ScoredEntry>>,
}

/// External device scorer. `None` means the service could not rank at all.
#[async_trait]
pub trait RankingGateway: Send + Sync {
    async fn score_devices(&self, request: &RankingRequest) -> Option<Vec<ScoredEntry>>;
}

pub struct HttpRankingGateway {
    client: Client,
    url: String,
}

impl HttpRankingGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build ranking http client")?;
        Ok(Self { client, url: url.into() })
    }

    pub fn from_config(config: &RankingConfig) -> Result<Self> {
        Self::new(config.url.trim(), Duration::from_millis(config.timeout_ms))
    }
}

#[async_trait]
impl RankingGateway for HttpRankingGateway {
    async fn score_devices(&self, request: &RankingRequest) -> Option<Vec<ScoredEntry>> {
        let response = match self.client.post(&self.url).json(request).send().await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    event_name = "agent.ranking.request_failed",
                    error = %err,
                    timeout = err.is_timeout(),
                    "ranking service request failed"
                );
                return None;
            }
        };

        if !response.status().is_success() {
            error!(
                event_name = "agent.ranking.bad_status",
                status = %response.status(),
                "ranking service returned a non-success status"
            );
            return None;
        }

        match response.json::<ScoresEnvelope>().await {
            Ok(ScoresEnvelope { scores: Some(scores) }) => Some(scores),
            Ok(ScoresEnvelope { scores: None }) => {
                error!(
                    event_name = "agent.ranking.missing_scores",
                    "ranking payload had no scores"
                );
                None
            }
            Err(err) => {
                error!(
                    event_name = "agent.ranking.decode_failed",
                    error = %err,
                    "failed to decode ranking payload"
                );
                None
            }
        }
    }
}
