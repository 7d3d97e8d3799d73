pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;

pub use audit::{SearchEvent, SearchEventId};
pub use domain::conversation::{last_user_turn, AssistantTurn, ConversationTurn, UserTurn};
pub use domain::criterion::{Aspect, Criterion, PreferenceLevel, PriceRange};
pub use domain::device::{Device, DeviceId, MatchExplanation, ScoredDevice};
pub use domain::history::{HistoryId, NewHistoryRecord, SearchMetadata, UserId};
pub use domain::selectors::SelectorMap;
pub use errors::{ApplicationError, DomainError, InterfaceError};
