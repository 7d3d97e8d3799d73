use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::criterion::Criterion;
use crate::domain::history::UserId;
use crate::domain::selectors::SelectorMap;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchEventId(pub String);

/// Audit record of one orchestration call: what the user typed and picked,
/// what the AI proposed, and what was finally used. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEvent {
    pub event_id: SearchEventId,
    pub user_id: Option<UserId>,
    pub free_text: Option<String>,
    pub ui_selectors: SelectorMap,
    pub ai_criteria: Option<Vec<Criterion>>,
    pub used_criteria: Vec<Criterion>,
    pub discarded_criteria: Vec<Criterion>,
    pub created_at: DateTime<Utc>,
}

impl SearchEvent {
    pub fn new(user_id: Option<UserId>, ui_selectors: SelectorMap) -> Self {
        Self {
            event_id: SearchEventId(Uuid::new_v4().to_string()),
            user_id,
            free_text: None,
            ui_selectors,
            ai_criteria: None,
            used_criteria: Vec::new(),
            discarded_criteria: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_free_text(mut self, free_text: Option<String>) -> Self {
        self.free_text = free_text;
        self
    }

    pub fn with_ai_criteria(mut self, ai_criteria: Option<Vec<Criterion>>) -> Self {
        self.ai_criteria = ai_criteria;
        self
    }

    pub fn with_used_criteria(mut self, used_criteria: Vec<Criterion>) -> Self {
        self.used_criteria = used_criteria;
        self
    }

    pub fn with_discarded_criteria(mut self, discarded_criteria: Vec<Criterion>) -> Self {
        self.discarded_criteria = discarded_criteria;
        self
    }
}
