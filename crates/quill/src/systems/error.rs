use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("System unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Tool execution failed: {0}")]
    ToolCall(String),

    /// The connection to the system itself broke; the system is marked failed
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Tool call timed out after {0:?}")]
    Timeout(Duration),
}

pub type SystemResult<T> = Result<T, SystemError>;

/// A system could not be connected or its tools could not be listed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to connect system '{system}': {reason}")]
pub struct ConnectError {
    pub system: String,
    pub reason: String,
}

impl ConnectError {
    pub fn new<S: Into<String>, R: ToString>(system: S, reason: R) -> Self {
        Self {
            system: system.into(),
            reason: reason.to_string(),
        }
    }
}
