use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{Display, EnumIter, EnumString};
use tokio::time::timeout;

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::tool::Tool;
use crate::prompt_template::load_prompt_file;
use crate::providers::base::{Completion, Provider, StopReason};
use crate::systems::{SystemError, ToolRegistry};

/// The assistant's reply to prior context, seeded ahead of the real request
pub const CONTEXT_ACKNOWLEDGEMENT: &str =
    "Understood. I have reviewed the context and will use it for this task.";

pub const DEFAULT_MAX_TURNS: usize = 20;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(300);

/// The three roles of the writing pipeline
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentKind {
    Researcher,
    Analyzer,
    Writer,
}

impl AgentKind {
    /// Parse a user supplied agent name
    pub fn parse(name: &str) -> AgentResult<Self> {
        Self::from_str(name.trim())
            .map_err(|_| AgentError::InvalidRequest(format!("unknown agent type: {}", name)))
    }

    /// Only the researcher is allowed to call tools
    pub fn tools_enabled(self) -> bool {
        match self {
            AgentKind::Researcher => true,
            AgentKind::Analyzer | AgentKind::Writer => false,
        }
    }

    fn prompt_template(self) -> &'static str {
        match self {
            AgentKind::Researcher => "researcher.md",
            AgentKind::Analyzer => "analyzer.md",
            AgentKind::Writer => "writer.md",
        }
    }

    pub fn system_prompt(self, tools: &[Tool]) -> AgentResult<String> {
        let mut context = HashMap::new();
        context.insert("tools", tools);
        load_prompt_file(self.prompt_template(), &context)
            .map_err(|e| AgentError::Prompt(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Model calls allowed in one run before it fails with [`AgentError::TurnLimitExceeded`]
    pub max_turns: usize,
    pub model_timeout: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            model_timeout: Some(DEFAULT_MODEL_TIMEOUT),
        }
    }
}

enum LoopState {
    AwaitingModel,
    /// The model asked for tools in this response
    DispatchingTools(Message),
    Done(Message),
}

/// Agent drives one role's conversation with the model until it has a final answer
pub struct Agent {
    kind: AgentKind,
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(kind: AgentKind, provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            kind,
            provider,
            registry,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// The tools this agent may offer the model
    pub fn tools(&self) -> Vec<Tool> {
        if self.kind.tools_enabled() {
            self.registry.tools()
        } else {
            Vec::new()
        }
    }

    fn start(&self, message: &str, context: Option<&str>) -> AgentResult<Conversation> {
        let tools = self.tools();
        let system_prompt = self.kind.system_prompt(&tools)?;
        let mut conversation = Conversation::new(system_prompt, tools);

        if let Some(prior) = context.filter(|prior| !prior.trim().is_empty()) {
            conversation.push(Message::user().with_text(prior));
            conversation.push(Message::assistant().with_text(CONTEXT_ACKNOWLEDGEMENT));
        }
        conversation.push(Message::user().with_text(message));
        Ok(conversation)
    }

    /// Run the conversation to completion and return the final answer's text
    pub async fn reply(&self, message: &str, context: Option<&str>) -> AgentResult<String> {
        if message.trim().is_empty() {
            return Err(AgentError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let mut conversation = self.start(message, context)?;
        let mut state = LoopState::AwaitingModel;
        let mut turns = 0;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if turns >= self.config.max_turns {
                        tracing::warn!(agent = %self.kind, turns, "turn limit reached");
                        return Err(AgentError::TurnLimitExceeded(self.config.max_turns));
                    }
                    turns += 1;

                    let completion = self.call_model(&conversation, turns).await?;
                    match completion.stop_reason {
                        StopReason::ToolUse if completion.message.has_tool_requests() => {
                            LoopState::DispatchingTools(completion.message)
                        }
                        _ => LoopState::Done(completion.message),
                    }
                }
                LoopState::DispatchingTools(response) => {
                    let results = self.dispatch_tools(&conversation, &response).await;
                    conversation.push(response);
                    conversation.push(results);
                    LoopState::AwaitingModel
                }
                LoopState::Done(response) => {
                    tracing::info!(agent = %self.kind, turns, "agent finished");
                    return Ok(response.text());
                }
            };
        }
    }

    async fn call_model(&self, conversation: &Conversation, turn: usize) -> AgentResult<Completion> {
        tracing::debug!(
            agent = %self.kind,
            turn,
            messages = conversation.len(),
            tools = conversation.tools().len(),
            "calling model"
        );

        let request = self.provider.complete(
            conversation.system_prompt(),
            conversation.messages(),
            conversation.tools(),
        );
        let result = match self.config.model_timeout {
            Some(limit) => timeout(limit, request)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => request.await,
        };

        let completion = result.map_err(|e| AgentError::ModelCall(format!("{e:#}")))?;
        tracing::debug!(
            agent = %self.kind,
            turn,
            stop_reason = ?completion.stop_reason,
            input_tokens = ?completion.usage.input_tokens,
            output_tokens = ?completion.usage.output_tokens,
            "model responded"
        );
        Ok(completion)
    }

    /// Answer every tool request in `response` with one user message, in request order
    async fn dispatch_tools(&self, conversation: &Conversation, response: &Message) -> Message {
        let futures = response
            .tool_requests()
            .map(|request| self.dispatch_tool_call(conversation, request));

        join_all(futures)
            .await
            .into_iter()
            .fold(Message::user(), Message::with_content)
    }

    async fn dispatch_tool_call(
        &self,
        conversation: &Conversation,
        request: &ToolRequest,
    ) -> MessageContent {
        let call = &request.tool_call;
        let result = if conversation.has_tool(&call.name) {
            self.registry
                .invoke(&call.name, call.arguments.clone())
                .await
        } else {
            Err(SystemError::ToolNotFound(call.name.clone()))
        };

        match result {
            Ok(outcome) => {
                tracing::debug!(agent = %self.kind, tool = %call.name, "tool call succeeded");
                MessageContent::tool_response(&request.id, outcome.render_text(), false)
            }
            Err(err) => {
                tracing::warn!(agent = %self.kind, tool = %call.name, error = %err, "tool call failed");
                MessageContent::tool_response(&request.id, format!("Error: {}", err), true)
            }
        }
    }
}
