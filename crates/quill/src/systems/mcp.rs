use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::config::SystemConfig;
use super::error::{ConnectError, SystemError, SystemResult};
use super::system::{System, ToolOutcome};
use crate::models::tool::{Tool, ToolCall};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A system reached over MCP's stdio transport: newline delimited JSON-RPC 2.0
/// on the stdin/stdout of a child process
pub struct McpSystem {
    name: String,
    // Every request holds this lock for its whole round trip, so concurrent
    // callers are serialized by the transport.
    process: Mutex<Option<StdioProcess>>,
    request_id: AtomicU64,
    request_timeout: Duration,
}

struct StdioProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Drop for StdioProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

impl McpSystem {
    /// Launch the system process and perform the initialize handshake.
    ///
    /// The request timeout bounds the handshake and tool listing only; how long a
    /// tool call may run is left to the caller.
    pub async fn connect(name: &str, config: &SystemConfig) -> Result<Self, ConnectError> {
        Self::connect_with_timeout(name, config, DEFAULT_REQUEST_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        name: &str,
        config: &SystemConfig,
        request_timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let process = StdioProcess::spawn(name, &config.resolve())
            .map_err(|err| ConnectError::new(name, format!("{err:#}")))?;

        let system = Self {
            name: name.to_string(),
            process: Mutex::new(Some(process)),
            request_id: AtomicU64::new(1),
            request_timeout,
        };
        system
            .initialize()
            .await
            .map_err(|err| ConnectError::new(name, err))?;

        tracing::info!(system = %name, command = %config.command, "connected system");
        Ok(system)
    }

    async fn initialize(&self) -> SystemResult<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "quill",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        let result = self.request("initialize", params).await?;
        let server_info = result.get("serverInfo").cloned().unwrap_or_default();
        tracing::debug!(
            system = %self.name,
            server = %server_info,
            "initialize handshake complete"
        );

        self.notify("notifications/initialized", json!({})).await
    }

    async fn notify(&self, method: &str, params: Value) -> SystemResult<()> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });

        let mut guard = self.process.lock().await;
        let process = guard.as_mut().ok_or_else(|| self.closed())?;
        if let Err(err) = process.send(&body).await {
            guard.take();
            return Err(err);
        }
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> SystemResult<Value> {
        self.request_within(method, params, Some(self.request_timeout))
            .await
    }

    async fn request_within(
        &self,
        method: &str,
        params: Value,
        limit: Option<Duration>,
    ) -> SystemResult<Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        let mut guard = self.process.lock().await;
        let process = guard.as_mut().ok_or_else(|| self.closed())?;
        let name = &self.name;
        let exchange = async {
            process.send(&body).await?;
            loop {
                let message = process.read_message().await?;
                if matches_request(&message, id) {
                    return Ok::<Value, SystemError>(message);
                }
                tracing::trace!(system = %name, %message, "skipping unrelated message");
            }
        };
        let outcome = match limit {
            Some(limit) => timeout(limit, exchange).await.map_err(|_| limit),
            None => Ok(exchange.await),
        };

        match outcome {
            Ok(Ok(response)) => extract_result(response),
            Ok(Err(err)) => {
                // The pipe is broken; later requests fail fast
                guard.take();
                Err(err)
            }
            // The late response is skipped by id on the next request
            Err(limit) => Err(SystemError::Timeout(limit)),
        }
    }

    fn closed(&self) -> SystemError {
        SystemError::Transport(format!("system {} is not running", self.name))
    }
}

#[async_trait]
impl System for McpSystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> SystemResult<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: ToolListResponse = serde_json::from_value(result).map_err(|err| {
                SystemError::ToolCall(format!("invalid tools/list response: {err}"))
            })?;

            tools.extend(page.tools.into_iter().map(|tool| {
                Tool::new(
                    tool.name,
                    tool.description.unwrap_or_default(),
                    tool.input_schema,
                )
            }));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    async fn call(&self, tool_call: ToolCall) -> SystemResult<ToolOutcome> {
        let params = json!({
            "name": tool_call.name,
            "arguments": tool_call.arguments,
        });
        let result = self.request_within("tools/call", params, None).await?;

        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let outcome = ToolOutcome::from_raw(result);
        if is_error {
            return Err(SystemError::ToolCall(outcome.render_text()));
        }
        Ok(outcome)
    }

    async fn close(&self) {
        if let Some(mut process) = self.process.lock().await.take() {
            let _ = process.child.start_kill();
            let _ = process.child.wait().await;
            tracing::info!(system = %self.name, "closed system");
        }
    }
}

impl StdioProcess {
    fn spawn(name: &str, config: &SystemConfig) -> anyhow::Result<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .with_context(|| format!("spawning {}", config.command))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("failed to capture stdin of {}", config.command))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("failed to capture stdout of {}", config.command))?;

        if let Some(stderr) = child.stderr.take() {
            let name = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(system = %name, "{}", line);
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn send(&mut self, body: &Value) -> SystemResult<()> {
        let mut payload = body.to_string();
        payload.push('\n');
        self.stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|err| SystemError::Transport(format!("writing request: {err}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|err| SystemError::Transport(format!("flushing request: {err}")))
    }

    async fn read_message(&mut self) -> SystemResult<Value> {
        loop {
            let mut line = String::new();
            let read = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|err| SystemError::Transport(format!("reading response: {err}")))?;
            if read == 0 {
                return Err(SystemError::Transport("system closed stdout".to_string()));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => return Ok(value),
                Err(err) => tracing::warn!(%err, line = %trimmed, "ignoring non JSON output"),
            }
        }
    }
}

fn matches_request(payload: &Value, request_id: u64) -> bool {
    match payload.get("id") {
        Some(Value::Number(num)) => num.as_u64() == Some(request_id),
        Some(Value::String(text)) => text.parse::<u64>().map_or(false, |id| id == request_id),
        _ => false,
    }
}

fn extract_result(payload: Value) -> SystemResult<Value> {
    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(SystemError::ToolCall(message));
    }

    Ok(payload.get("result").cloned().unwrap_or(Value::Null))
}

fn default_input_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolListResponse {
    #[serde(default)]
    tools: Vec<RemoteTool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_input_schema")]
    input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_request_by_number_or_string() {
        assert!(matches_request(&json!({"id": 7, "result": {}}), 7));
        assert!(matches_request(&json!({"id": "7", "result": {}}), 7));
        assert!(!matches_request(&json!({"id": 8, "result": {}}), 7));
        assert!(!matches_request(
            &json!({"method": "notifications/tools/list_changed"}),
            7
        ));
    }

    #[test]
    fn test_extract_result_error_message() {
        let err = extract_result(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap_err();
        assert_eq!(err, SystemError::ToolCall("Method not found".to_string()));
    }

    #[test]
    fn test_tool_list_defaults() -> serde_json::Result<()> {
        let page: ToolListResponse =
            serde_json::from_value(json!({"tools": [{"name": "search"}]}))?;
        assert_eq!(page.tools[0].description, None);
        assert_eq!(page.tools[0].input_schema, default_input_schema());
        assert!(page.next_cursor.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_missing_command_fails() {
        let config = SystemConfig::new("quill-definitely-not-a-real-command");
        let err = McpSystem::connect("ghost", &config).await.err().unwrap();
        assert_eq!(err.system, "ghost");
        assert!(err.reason.contains("spawning"));
    }
}
