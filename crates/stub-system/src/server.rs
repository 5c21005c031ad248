//! Newline delimited JSON-RPC 2.0 over a pair of byte streams.
//!
//! Handles `initialize`, `tools/list` (paged when a page size is set) and
//! `tools/call`. Notifications get no response.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

pub struct StubServer {
    name: String,
    page_size: Option<usize>,
}

impl StubServer {
    pub fn new(name: impl Into<String>, page_size: Option<usize>) -> Self {
        Self {
            name: name.into(),
            page_size: page_size.filter(|size| *size > 0),
        }
    }

    /// Serve until `input` reaches EOF
    pub async fn run(
        &self,
        input: impl AsyncBufRead + Unpin,
        mut output: impl AsyncWrite + Unpin,
    ) -> Result<()> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request: Request = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(%err, "unparseable request");
                    let response = Response::error(Value::Null, PARSE_ERROR, "Parse error");
                    write_line(&mut output, &response).await?;
                    continue;
                }
            };

            let Some(id) = request.id else {
                tracing::debug!(method = %request.method, "notification");
                continue;
            };

            tracing::debug!(method = %request.method, %id, "request");
            let response = self
                .handle(&request.method, request.params.unwrap_or(Value::Null), id)
                .await;
            write_line(&mut output, &response).await?;
        }
        Ok(())
    }

    async fn handle(&self, method: &str, params: Value, id: Value) -> Response {
        match method {
            "initialize" => Response::ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": self.name,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            ),
            "tools/list" => self.list_tools(&params, id),
            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return Response::error(id, INVALID_PARAMS, "missing tool name");
                };
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
                match tools::call(name, arguments).await {
                    Some(outcome) => Response::ok(id, outcome.into_result()),
                    None => Response::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name)),
                }
            }
            _ => Response::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            ),
        }
    }

    fn list_tools(&self, params: &Value, id: Value) -> Response {
        let catalog = tools::catalog();
        let Some(page_size) = self.page_size else {
            return Response::ok(id, json!({ "tools": catalog }));
        };

        let start = match params.get("cursor").and_then(Value::as_str) {
            None => 0,
            Some(cursor) => match cursor.parse::<usize>() {
                Ok(start) if start <= catalog.len() => start,
                _ => return Response::error(id, INVALID_PARAMS, "invalid cursor"),
            },
        };
        let end = (start + page_size).min(catalog.len());
        let mut result = json!({ "tools": &catalog[start..end] });
        if end < catalog.len() {
            result["nextCursor"] = json!(end.to_string());
        }
        Response::ok(id, result)
    }
}

async fn write_line(output: &mut (impl AsyncWrite + Unpin), response: &Response) -> Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
