use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use qualcel_core::audit::{SearchEvent, SearchEventId};
use qualcel_core::domain::conversation::{last_user_turn, ConversationTurn};
use qualcel_core::domain::criterion::Criterion;
use qualcel_core::domain::device::ScoredDevice;
use qualcel_core::domain::history::{SearchMetadata, UserId};
use qualcel_core::domain::selectors::SelectorMap;
use qualcel_core::errors::{ApplicationError, DomainError};
use qualcel_db::repositories::SearchEventRepository;

use crate::coverage::CriteriaCoverage;
use crate::criteria::{
    collect_console_input, criteria_from_selectors, merge_criteria_lists, split_user_criteria,
};
use crate::heuristics::infer_criteria_from_keywords;
use crate::matching::MatchingFacade;
use crate::orchestration::{is_fallback_question, CriteriaOrchestrator};

/// What the client renders next: a clarifying question or ranked devices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchOutcome {
    Ask { question: String },
    Result(Vec<ScoredDevice>),
}

pub struct ConversationalFacade {
    orchestrator: Arc<dyn CriteriaOrchestrator>,
    search_events: Arc<dyn SearchEventRepository>,
    matching: Arc<MatchingFacade>,
}

impl ConversationalFacade {
    pub fn new(
        orchestrator: Arc<dyn CriteriaOrchestrator>,
        search_events: Arc<dyn SearchEventRepository>,
        matching: Arc<MatchingFacade>,
    ) -> Self {
        Self { orchestrator, search_events, matching }
    }

    /// Merges every criteria source for the latest user turn, then either
    /// searches or asks. A search needs minimum coverage and either a model
    /// decision to search or a model failure; otherwise the model's own
    /// question wins over the coverage question.
    pub async fn orchestrate_search(
        &self,
        history: &[ConversationTurn],
        selectors: &SelectorMap,
        user_id: Option<&UserId>,
    ) -> Result<SearchOutcome, ApplicationError> {
        if history.is_empty() {
            return Err(DomainError::EmptyHistory.into());
        }

        let decision = self.orchestrator.orchestrate(history, selectors).await;
        let ai_criteria = decision.criteria().map(<[Criterion]>::to_vec);
        let ai_question = decision.question();
        let ai_question_is_fallback = is_fallback_question(ai_question);

        let last_user = last_user_turn(history);
        let console_input = collect_console_input(last_user);
        let split = split_user_criteria(last_user);
        let free_text: Vec<String> = split
            .free_text
            .iter()
            .map(|chunk| chunk.trim().to_owned())
            .filter(|chunk| !chunk.is_empty())
            .collect();
        let text_chunks: Vec<String> =
            free_text.iter().cloned().chain(console_input.clone()).collect();

        let extracted = if free_text.is_empty() {
            None
        } else {
            Some(self.orchestrator.extract(&text_chunks.join(". ")).await)
        };
        let heuristics = infer_criteria_from_keywords(&text_chunks);
        let selector_criteria = criteria_from_selectors(selectors);

        let final_criteria = merge_criteria_lists([
            Some(split.structured.as_slice()),
            Some(selector_criteria.as_slice()),
            ai_criteria.as_deref(),
            extracted.as_deref(),
            Some(heuristics.as_slice()),
        ]);

        let event_free_text = console_input.clone().or_else(|| free_text.first().cloned());
        let event_id = self
            .record_search_event(user_id, selectors, event_free_text, ai_criteria, &final_criteria)
            .await;

        let coverage = CriteriaCoverage::analyze(&final_criteria);
        let should_match = !final_criteria.is_empty()
            && coverage.has_minimum()
            && (decision.criteria().is_some() || ai_question_is_fallback);

        info!(
            event_name = "agent.conversation.decided",
            criteria = final_criteria.len(),
            has_price = coverage.has_price,
            aspects = coverage.aspects.len(),
            ai_fallback = ai_question_is_fallback,
            search = should_match,
            "conversation step decided"
        );

        if should_match {
            let metadata = SearchMetadata {
                console_input,
                selectors: selectors.clone(),
                event_id,
            };
            let devices =
                self.matching.find_matches(&final_criteria, user_id, Some(&metadata)).await?;
            return Ok(SearchOutcome::Result(devices));
        }

        let question = match ai_question {
            Some(question) if !ai_question_is_fallback => question.to_owned(),
            _ => coverage.question().to_owned(),
        };
        Ok(SearchOutcome::Ask { question })
    }

    async fn record_search_event(
        &self,
        user_id: Option<&UserId>,
        selectors: &SelectorMap,
        free_text: Option<String>,
        ai_criteria: Option<Vec<Criterion>>,
        used: &[Criterion],
    ) -> Option<SearchEventId> {
        let used_keys: HashSet<String> = used.iter().map(Criterion::dedup_key).collect();
        let discarded = ai_criteria
            .iter()
            .flatten()
            .filter(|criterion| {
                criterion.normalized().map_or(true, |c| !used_keys.contains(&c.dedup_key()))
            })
            .cloned()
            .collect();

        let event = SearchEvent::new(user_id.cloned(), selectors.clone())
            .with_free_text(free_text)
            .with_ai_criteria(ai_criteria)
            .with_used_criteria(used.to_vec())
            .with_discarded_criteria(discarded);

        match self.search_events.record(event).await {
            Ok(event_id) => Some(event_id),
            Err(err) => {
                warn!(
                    event_name = "agent.conversation.search_event_failed",
                    error = %err,
                    "failed to record search event"
                );
                None
            }
        }
    }
}
