use crate::routes::error_response;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use quill::agent::{Agent, AgentKind};
use quill::errors::AgentError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct AgentRequest {
    agent: Option<String>,
    message: Option<String>,
    context: Option<String>,
}

#[derive(Debug, Serialize)]
struct AgentResponse {
    result: String,
}

async fn run_agent(
    State(state): State<AppState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(agent) = request.agent.filter(|agent| !agent.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing field: agent");
    };
    let kind = match AgentKind::parse(&agent) {
        Ok(kind) => kind,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let Some(message) = request.message.filter(|message| !message.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing field: message");
    };

    let agent = Agent::new(kind, state.provider.clone(), state.registry.clone())
        .with_config(state.agent_config.clone());

    match agent.reply(&message, request.context.as_deref()).await {
        Ok(result) => (StatusCode::OK, Json(AgentResponse { result })).into_response(),
        Err(err @ AgentError::InvalidRequest(_)) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => {
            tracing::error!(agent = %kind, error = %err, "agent request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/agent", post(run_agent))
        .with_state(state)
}
