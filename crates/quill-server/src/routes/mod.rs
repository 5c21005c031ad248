// Export route modules
pub mod agent;
pub mod pipeline;
pub mod systems;
pub mod tools;

use crate::state::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(agent::routes(state.clone()))
        .merge(pipeline::routes(state.clone()))
        .merge(tools::routes(state.clone()))
        .merge(systems::routes(state))
}

/// The api routes with CORS, falling back to `static_dir` when one is given
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = configure(state);
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.layer(cors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use quill::agent::AgentConfig;
    use quill::models::tool::{Tool, ToolCall};
    use quill::providers::base::Provider;
    use quill::systems::{System, SystemError, SystemResult, ToolOutcome, ToolRegistry};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Offers `search`, which echoes its query, and `broken`, which always fails
    pub struct WebSystem;

    #[async_trait]
    impl System for WebSystem {
        fn name(&self) -> &str {
            "web"
        }

        async fn list_tools(&self) -> SystemResult<Vec<Tool>> {
            Ok(vec![
                Tool::new("search", "Search the web", json!({"type": "object"})),
                Tool::new("broken", "Always fails", json!({"type": "object"})),
            ])
        }

        async fn call(&self, tool_call: ToolCall) -> SystemResult<ToolOutcome> {
            match tool_call.name.as_str() {
                "search" => Ok(ToolOutcome::text(format!(
                    "results for {}",
                    tool_call.arguments["query"]
                ))),
                _ => Err(SystemError::ToolCall("broken".to_string())),
            }
        }
    }

    pub async fn state_with(provider: Arc<dyn Provider>) -> AppState {
        let mut registry = ToolRegistry::new();
        registry.register_system(Arc::new(WebSystem)).await.unwrap();
        AppState {
            provider,
            registry: Arc::new(registry),
            agent_config: AgentConfig::default(),
        }
    }

    pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }
}
