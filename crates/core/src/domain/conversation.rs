use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::criterion::Criterion;
use super::selectors::SelectorMap;

/// One entry of the chat history the client sends with every request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConversationTurn {
    User(UserTurn),
    Assistant(AssistantTurn),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTurn {
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorMap>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTurn {
    #[serde(alias = "skeleton")]
    Loading,
    Text { content: String },
    /// Devices shown to the user; older clients send them as `items` or `payload`.
    Cards {
        #[serde(default, alias = "items", alias = "payload")]
        cards: Vec<Value>,
    },
    Error { content: String },
}

impl ConversationTurn {
    pub fn user(turn: UserTurn) -> Self {
        Self::User(turn)
    }

    pub fn as_user(&self) -> Option<&UserTurn> {
        match self {
            Self::User(turn) => Some(turn),
            Self::Assistant(_) => None,
        }
    }
}

/// The most recent user turn, if any.
pub fn last_user_turn(history: &[ConversationTurn]) -> Option<&UserTurn> {
    history.iter().rev().find_map(ConversationTurn::as_user)
}
