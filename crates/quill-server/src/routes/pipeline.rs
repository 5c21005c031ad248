use crate::routes::error_response;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use quill::pipeline::Pipeline;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct PipelineRequest {
    topic: Option<String>,
}

#[derive(Debug, Serialize)]
struct PipelineResponse {
    result: String,
    research: String,
    analysis: String,
}

async fn run_pipeline(
    State(state): State<AppState>,
    payload: Result<Json<PipelineRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let Some(topic) = request.topic.filter(|topic| !topic.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing field: topic");
    };

    let pipeline = Pipeline::new(state.provider.clone(), state.registry.clone())
        .with_config(state.agent_config.clone());

    match pipeline.run_stages(&topic).await {
        Ok(output) => (
            StatusCode::OK,
            Json(PipelineResponse {
                result: output.report,
                research: output.research,
                analysis: output.analysis,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "pipeline request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/pipeline", post(run_pipeline))
        .with_state(state)
}
