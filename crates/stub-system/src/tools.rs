use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Outcome of one `tools/call`
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Text(String),
    Error(String),
}

impl CallOutcome {
    pub fn into_result(self) -> Value {
        let (text, is_error) = match self {
            CallOutcome::Text(text) => (text, false),
            CallOutcome::Error(text) => (text, true),
        };
        json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
        })
    }
}

/// Every tool the stub offers, in listing order
pub fn catalog() -> Vec<Value> {
    vec![
        json!({
            "name": "echo",
            "description": "Return the given text unchanged",
            "inputSchema": {
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }
        }),
        json!({
            "name": "fail",
            "description": "Always report a tool error",
            "inputSchema": {
                "type": "object",
                "properties": { "message": { "type": "string" } }
            }
        }),
        json!({
            "name": "read_env",
            "description": "Return the value of an environment variable of this process",
            "inputSchema": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }
        }),
        json!({
            "name": "sleep",
            "description": "Wait for the given number of milliseconds, then return the text",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "ms": { "type": "integer" },
                    "text": { "type": "string" }
                },
                "required": ["ms"]
            }
        }),
        json!({
            "name": "crash",
            "description": "Exit the process without answering",
            "inputSchema": { "type": "object" }
        }),
    ]
}

#[derive(Debug, Deserialize)]
struct EchoArgs {
    text: String,
}

#[derive(Debug, Deserialize)]
struct FailArgs {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadEnvArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SleepArgs {
    ms: u64,
    #[serde(default)]
    text: Option<String>,
}

fn parse<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, CallOutcome> {
    serde_json::from_value(arguments)
        .map_err(|err| CallOutcome::Error(format!("invalid arguments for {}: {}", tool, err)))
}

/// Run a tool; `None` means the tool does not exist
pub async fn call(name: &str, arguments: Value) -> Option<CallOutcome> {
    let outcome = match name {
        "echo" => parse::<EchoArgs>(name, arguments).map(|args| CallOutcome::Text(args.text)),
        "fail" => parse::<FailArgs>(name, arguments).map(|args| {
            CallOutcome::Error(args.message.unwrap_or_else(|| "stub failure".to_string()))
        }),
        "read_env" => parse::<ReadEnvArgs>(name, arguments).map(|args| {
            match std::env::var(&args.name) {
                Ok(value) => CallOutcome::Text(value),
                Err(_) => CallOutcome::Error(format!("{} is not set", args.name)),
            }
        }),
        "sleep" => match parse::<SleepArgs>(name, arguments) {
            Ok(args) => {
                tokio::time::sleep(Duration::from_millis(args.ms)).await;
                Ok(CallOutcome::Text(
                    args.text.unwrap_or_else(|| format!("slept {}ms", args.ms)),
                ))
            }
            Err(err) => Err(err),
        },
        "crash" => {
            tracing::warn!("crash requested, exiting");
            std::process::exit(1);
        }
        _ => return None,
    };
    Some(outcome.unwrap_or_else(|err| err))
}
