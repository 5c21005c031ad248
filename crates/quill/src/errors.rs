use std::time::Duration;
use thiserror::Error;

use crate::agent::AgentKind;

#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Agent did not produce a final answer within {0} turns")]
    TurnLimitExceeded(usize),

    #[error("Failed to render system prompt: {0}")]
    Prompt(String),
}

impl AgentError {
    /// Whether the same request may succeed if simply tried again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Timeout(_))
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

/// A pipeline stage failed; the pipeline stops at the first failing stage
#[derive(Error, Debug, Clone)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: AgentKind,
    #[source]
    pub source: AgentError,
}
