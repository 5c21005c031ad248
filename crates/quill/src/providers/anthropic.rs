use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Completion, Provider, StopReason, Usage};
use super::configs::AnthropicProviderConfig;
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{Tool, ToolCall};

pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: i32 = 4096;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = &data["usage"];
        let input_tokens = usage["input_tokens"].as_i64().map(|v| v as i32);
        let output_tokens = usage["output_tokens"].as_i64().map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };
        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .filter(|message| !message.content.is_empty())
            .map(|message| {
                let content: Vec<Value> = message
                    .content
                    .iter()
                    .map(|content| match content {
                        MessageContent::Text(text) => json!({
                            "type": "text",
                            "text": text.text,
                        }),
                        MessageContent::ToolRequest(request) => json!({
                            "type": "tool_use",
                            "id": request.id,
                            "name": request.tool_call.name,
                            "input": request.tool_call.arguments,
                        }),
                        MessageContent::ToolResponse(response) => json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": response.content,
                            "is_error": response.is_error,
                        }),
                    })
                    .collect();

                json!({
                    "role": message.role,
                    "content": content
                })
            })
            .collect()
    }

    fn tools_to_anthropic_spec(tools: &[Tool]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect()
    }

    fn response_to_message(response: &Value) -> Result<Message> {
        let blocks = response
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

        let mut message = Message::assistant();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    message = message.with_text(block["text"].as_str().unwrap_or_default());
                }
                Some("tool_use") => {
                    let id = block["id"].as_str().unwrap_or_default();
                    let name = block["name"].as_str().unwrap_or_default();
                    let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                    message = message.with_tool_request(id, ToolCall::new(name, input));
                }
                other => tracing::debug!(block_type = ?other, "skipping content block"),
            }
        }
        Ok(message)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let error_text = response.text().await?;
                Err(anyhow!("Request failed: {} - {}", status, error_text))
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": Self::messages_to_anthropic_spec(messages),
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
        });

        if !system.is_empty() {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(Self::tools_to_anthropic_spec(tools));
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }

        let response = self.post(payload).await?;

        let message = Self::response_to_message(&response)?;
        let stop_reason = match response["stop_reason"].as_str() {
            Some("tool_use") => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };
        let usage = Self::get_usage(&response);

        Ok(Completion::new(message, stop_reason, usage))
    }
}
