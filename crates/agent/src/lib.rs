//! Recommendation pipeline - from chat turns and UI filters to ranked devices
//!
//! A request flows through:
//! 1. **Criteria normalization** (`criteria`) - trim, split and merge criteria lists
//! 2. **Keyword heuristics** (`heuristics`) - regex inference over free text
//! 3. **Coverage** (`coverage`) - decide whether there is enough to search
//! 4. **AI orchestration** (`orchestration`, `llm`) - ask-or-search decision and extraction
//! 5. **Matching** (`matching`, `ranking`) - catalog fetch and external ranking
//!
//! `conversation::ConversationalFacade` ties the steps together.
//!
//! The generative model is advisory only. A failed or malformed model answer
//! degrades to a clarifying question; the local heuristics and the coverage
//! gate decide whether a search actually runs.

pub mod conversation;
pub mod coverage;
pub mod criteria;
pub mod heuristics;
pub mod llm;
pub mod matching;
pub mod orchestration;
pub mod ranking;

pub use conversation::{ConversationalFacade, SearchOutcome};
pub use coverage::CriteriaCoverage;
pub use matching::MatchingFacade;
pub use orchestration::{CriteriaOrchestrator, LlmOrchestrator, OrchestratorDecision};
pub use ranking::{HttpRankingGateway, RankingGateway};
