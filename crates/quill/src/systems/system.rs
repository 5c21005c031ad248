use async_trait::async_trait;
use serde_json::Value;

use super::error::SystemResult;
use crate::models::tool::{Tool, ToolCall};

/// One segment of a tool call result
#[derive(Debug, Clone, PartialEq)]
pub enum ToolContent {
    Text(String),
    /// Anything that is not text (images, resources, ...), kept as received
    Other(Value),
}

/// The typed result of a successful tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: Vec<ToolContent>,
    /// The full response exactly as the system returned it
    pub raw: Value,
}

impl ToolOutcome {
    /// Build an outcome from an MCP style `{ "content": [{ "type": "text", "text": .. }, ..] }` value
    pub fn from_raw(raw: Value) -> Self {
        let content = raw
            .get("content")
            .and_then(Value::as_array)
            .map(|segments| {
                segments
                    .iter()
                    .map(|segment| {
                        let is_text = segment.get("type").and_then(Value::as_str) == Some("text");
                        match segment.get("text").and_then(Value::as_str) {
                            Some(text) if is_text => ToolContent::Text(text.to_string()),
                            _ => ToolContent::Other(segment.clone()),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { content, raw }
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        Self {
            raw: serde_json::json!({ "content": [{ "type": "text", "text": text }] }),
            content: vec![ToolContent::Text(text)],
        }
    }

    /// Text segments joined by newlines, or the raw response as JSON when there is no text
    pub fn render_text(&self) -> String {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|segment| match segment {
                ToolContent::Text(text) => Some(text.as_str()),
                ToolContent::Other(_) => None,
            })
            .collect();

        if texts.is_empty() {
            self.raw.to_string()
        } else {
            texts.join("\n")
        }
    }
}

/// Core trait that defines a connected system offering tools to the agents
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system, used as the namespace of its tools
    fn name(&self) -> &str;

    /// Ask the system which tools it currently offers, with their local names
    async fn list_tools(&self) -> SystemResult<Vec<Tool>>;

    /// Call one of the system's tools by its local name
    async fn call(&self, tool_call: ToolCall) -> SystemResult<ToolOutcome>;

    /// Release the underlying transport. Calls after close fail.
    async fn close(&self) {}
}
