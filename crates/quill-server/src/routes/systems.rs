use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use quill::systems::ConnectionStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SystemSummary {
    name: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemsResponse {
    systems: Vec<SystemSummary>,
}

async fn list_systems(State(state): State<AppState>) -> Json<SystemsResponse> {
    let systems = state
        .registry
        .statuses()
        .into_iter()
        .map(|(name, status)| match status {
            ConnectionStatus::Connected => SystemSummary {
                name,
                status: "connected",
                error: None,
            },
            ConnectionStatus::Failed(reason) => SystemSummary {
                name,
                status: "failed",
                error: Some(reason),
            },
        })
        .collect();
    Json(SystemsResponse { systems })
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/systems", get(list_systems))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{json_request, send, WebSystem};
    use axum::http::StatusCode;
    use quill::agent::AgentConfig;
    use quill::providers::mock::MockProvider;
    use quill::systems::{SystemConfig, ToolRegistry};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_systems_reports_failures() {
        let mut registry = ToolRegistry::new();
        registry.register_system(Arc::new(WebSystem)).await.unwrap();
        let err = registry
            .register("ghost", &SystemConfig::new("quill-definitely-not-a-real-command"))
            .await
            .err()
            .unwrap();

        let state = AppState {
            provider: Arc::new(MockProvider::new(vec![])),
            registry: Arc::new(registry),
            agent_config: AgentConfig::default(),
        };

        let (status, body) = send(routes(state), json_request("GET", "/api/systems", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "systems": [
                    {"name": "web", "status": "connected"},
                    {"name": "ghost", "status": "failed", "error": err.reason}
                ]
            })
        );
    }
}
