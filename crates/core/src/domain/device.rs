use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::criterion::Criterion;
use super::history::HistoryId;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

/// A catalog device with its technical characteristics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub manufacturer: String,
    pub model: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub characteristics: Vec<Criterion>,
}

/// Average opinion score for one device and one aspect, as stored by the
/// sentiment pipeline. The scale is not guaranteed (0..1 or 0..5).
#[derive(Clone, Debug, PartialEq)]
pub struct AspectScoreRow {
    pub device_id: DeviceId,
    pub aspect: String,
    pub mean_score: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    #[serde(rename = "type", alias = "tipo")]
    pub kind: String,
    pub score: f64,
}

/// Breakdown returned by the ranking service for one device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchExplanation {
    #[serde(default)]
    pub spec_fit: f64,
    #[serde(default)]
    pub opinion_sim: f64,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub per_criterion: Vec<CriterionScore>,
}

/// A device decorated with the ranking service's verdict. Built per request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDevice {
    #[serde(flatten)]
    pub device: Device,
    pub match_score: f64,
    pub profile_match_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_match_percent: Option<f64>,
    pub match_explanation: MatchExplanation,
    #[serde(default)]
    pub justifications: Vec<String>,
    #[serde(rename = "historicoId", default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<HistoryId>,
}
