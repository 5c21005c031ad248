use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Completion, Provider};

/// Everything a [`MockProvider`] was asked for in one call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

type Responder = Box<dyn Fn(&str, &[Message]) -> Result<Completion> + Send + Sync>;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    /// Replay `responses` in order; once they run out every call fails
    pub fn new(responses: Vec<Completion>) -> Self {
        let queue = Mutex::new(responses.into_iter());
        Self::with_responder(move |_, _| {
            queue
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .next()
                .ok_or_else(|| anyhow!("mock provider has no more responses"))
        })
    }

    /// Compute each response from the system prompt and messages it was called with
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, &[Message]) -> Result<Completion> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                system: system.to_string(),
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|tool| tool.name.clone()).collect(),
            });
        (self.responder)(system, messages)
    }
}
