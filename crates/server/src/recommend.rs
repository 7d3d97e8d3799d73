use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use qualcel_agent::{ConversationalFacade, SearchOutcome};
use qualcel_core::domain::conversation::ConversationTurn;
use qualcel_core::domain::history::UserId;
use qualcel_core::domain::selectors::SelectorMap;
use qualcel_core::errors::{ApplicationError, DomainError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct RecommendState {
    facade: Arc<ConversationalFacade>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateRequest {
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub selectors: SelectorMap,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(facade: Arc<ConversationalFacade>) -> Router {
    Router::new()
        .route("/api/v1/devices/orchestrate", post(orchestrate))
        .with_state(RecommendState { facade })
}

pub async fn orchestrate(
    State(state): State<RecommendState>,
    Json(body): Json<OrchestrateRequest>,
) -> Result<Json<SearchOutcome>, (StatusCode, Json<ApiError>)> {
    let correlation_id = Uuid::new_v4().simple().to_string();
    let user_id = body
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| UserId(id.to_owned()));

    info!(
        event_name = "server.orchestrate.received",
        correlation_id = %correlation_id,
        turns = body.history.len(),
        has_user = user_id.is_some(),
        "orchestration request received"
    );

    if body.history.is_empty() {
        let interface = ApplicationError::from(DomainError::EmptyHistory)
            .into_interface(correlation_id.as_str());
        warn!(
            event_name = "server.orchestrate.rejected",
            correlation_id = %correlation_id,
            error = %interface,
            "orchestration request rejected"
        );
        return Err(bad_request(&interface));
    }

    match state.facade.orchestrate_search(&body.history, &body.selectors, user_id.as_ref()).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(app_error) => {
            let interface = app_error.into_interface(correlation_id.as_str());
            if matches!(interface, InterfaceError::BadRequest { .. }) {
                return Err(bad_request(&interface));
            }
            error!(
                event_name = "server.orchestrate.failed",
                correlation_id = %interface.correlation_id(),
                error = %interface,
                "orchestration failed; asking the user to retry"
            );
            Ok(Json(SearchOutcome::Ask { question: interface.user_message().to_owned() }))
        }
    }
}

fn bad_request(interface: &InterfaceError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: interface.user_message().to_owned(),
            correlation_id: interface.correlation_id().to_owned(),
        }),
    )
}
