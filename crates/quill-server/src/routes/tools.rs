use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ToolSummary {
    name: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct ToolsResponse {
    tools: Vec<ToolSummary>,
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools = state
        .registry
        .list_all()
        .into_iter()
        .map(|descriptor| ToolSummary {
            name: descriptor.qualified_name,
            description: descriptor.description,
        })
        .collect();
    Json(ToolsResponse { tools })
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/tools", get(list_tools))
        .with_state(state)
}
