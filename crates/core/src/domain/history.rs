use serde::{Deserialize, Serialize};

use super::criterion::Criterion;
use super::device::DeviceId;
use super::selectors::SelectorMap;
use crate::audit::SearchEventId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub String);

/// Context carried from the conversational layer into the history record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchMetadata {
    pub console_input: Option<String>,
    pub selectors: SelectorMap,
    pub event_id: Option<SearchEventId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryResult {
    pub device_id: DeviceId,
    pub match_score: f64,
    pub justifications: Vec<String>,
}

/// A user's saved search: the criteria used and the ranked list shown.
#[derive(Clone, Debug, PartialEq)]
pub struct NewHistoryRecord {
    pub user_id: UserId,
    pub criteria: Vec<Criterion>,
    pub console_input: Option<String>,
    pub selectors: SelectorMap,
    pub event_id: Option<SearchEventId>,
    pub results: Vec<HistoryResult>,
}
