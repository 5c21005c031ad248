use quill::agent::{Agent, AgentKind};
use quill::models::message::{Message, ToolResponse};
use quill::models::tool::ToolCall;
use quill::providers::base::Completion;
use quill::providers::mock::MockProvider;
use quill::systems::mcp::McpSystem;
use quill::systems::{ConnectionStatus, SystemConfig, SystemError, SystemsConfig, ToolRegistry};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const STUB: &str = env!("CARGO_BIN_EXE_stub-system");

fn stub() -> SystemConfig {
    SystemConfig::new(STUB)
}

#[tokio::test]
async fn test_tools_are_namespaced_per_system() {
    let mut registry = ToolRegistry::new();
    registry.register("alpha", &stub()).await.unwrap();
    registry.register("beta", &stub()).await.unwrap();

    let names: Vec<String> = registry
        .list_all()
        .into_iter()
        .map(|descriptor| descriptor.qualified_name)
        .collect();
    assert_eq!(
        names,
        vec![
            "alpha__echo",
            "alpha__fail",
            "alpha__read_env",
            "alpha__sleep",
            "alpha__crash",
            "beta__echo",
            "beta__fail",
            "beta__read_env",
            "beta__sleep",
            "beta__crash",
        ]
    );

    let echo = registry.lookup("beta__echo").unwrap();
    assert_eq!(echo.system_name, "beta");
    assert_eq!(echo.local_name, "echo");
    assert_eq!(echo.input_schema["required"], json!(["text"]));

    registry.shutdown().await;
}

#[tokio::test]
async fn test_paged_listing_is_followed() {
    let mut registry = ToolRegistry::new();
    registry
        .register("paged", &stub().with_args(["--page-size", "2"]))
        .await
        .unwrap();

    assert_eq!(registry.list_all().len(), 5);
    assert!(registry.lookup("paged__crash").is_some());
    registry.shutdown().await;
}

#[tokio::test]
async fn test_invoke_round_trip() {
    let mut registry = ToolRegistry::new();
    registry.register("stub", &stub()).await.unwrap();

    let outcome = registry
        .invoke("stub__echo", json!({"text": "hello"}))
        .await
        .unwrap();
    assert_eq!(outcome.render_text(), "hello");

    let err = registry.invoke("stub__fail", json!({"message": "nope"})).await.unwrap_err();
    assert_eq!(err, SystemError::ToolCall("nope".to_string()));

    let err = registry.invoke("stub__missing", json!({})).await.unwrap_err();
    assert_eq!(err, SystemError::ToolNotFound("stub__missing".to_string()));

    // A tool error leaves the system usable
    let outcome = registry
        .invoke("stub__echo", json!({"text": "still here"}))
        .await
        .unwrap();
    assert_eq!(outcome.render_text(), "still here");

    registry.shutdown().await;
}

#[tokio::test]
async fn test_crashed_system_becomes_unavailable() {
    let mut registry = ToolRegistry::new();
    registry.register("fragile", &stub()).await.unwrap();
    registry.register("sturdy", &stub()).await.unwrap();

    let err = registry.invoke("fragile__crash", json!({})).await.unwrap_err();
    assert!(matches!(err, SystemError::Transport(_)));

    let err = registry
        .invoke("fragile__echo", json!({"text": "hi"}))
        .await
        .unwrap_err();
    assert_eq!(err, SystemError::ProviderUnavailable("fragile".to_string()));
    assert!(registry.list_all().iter().all(|tool| tool.system_name == "sturdy"));

    let statuses = registry.statuses();
    assert!(matches!(statuses[0].1, ConnectionStatus::Failed(_)));
    assert_eq!(statuses[1].1, ConnectionStatus::Connected);

    let outcome = registry
        .invoke("sturdy__echo", json!({"text": "hi"}))
        .await
        .unwrap();
    assert_eq!(outcome.render_text(), "hi");

    registry.shutdown().await;
}

#[tokio::test]
async fn test_unstartable_system_is_skipped() {
    let config = SystemsConfig::from_json(&format!(
        r#"{{
            "mcpServers": {{
                "first": {{ "command": "{stub}" }},
                "ghost": {{ "command": "quill-definitely-not-a-real-command" }},
                "last": {{ "command": "{stub}" }}
            }}
        }}"#,
        stub = STUB
    ))
    .unwrap();

    let (registry, errors) = ToolRegistry::from_config(&config).await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].system, "ghost");

    let names: Vec<String> = registry.statuses().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["first", "ghost", "last"]);
    assert_eq!(registry.list_all().len(), 10);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_env_values_are_substituted() {
    std::env::set_var("QUILL_STUB_TEST_TOKEN", "s3cret");
    let config = stub()
        .with_env("STUB_TOKEN", "$QUILL_STUB_TEST_TOKEN")
        .with_env("STUB_UNSET", "$QUILL_STUB_TEST_NEVER_SET")
        .with_env("STUB_LITERAL", "plain");

    let mut registry = ToolRegistry::new();
    registry.register("env", &config).await.unwrap();

    let read = |name: &str| {
        let registry = &registry;
        let args = json!({ "name": name });
        async move { registry.invoke("env__read_env", args).await.unwrap().render_text() }
    };
    assert_eq!(read("STUB_TOKEN").await, "s3cret");
    assert_eq!(read("STUB_UNSET").await, "$QUILL_STUB_TEST_NEVER_SET");
    assert_eq!(read("STUB_LITERAL").await, "plain");

    registry.shutdown().await;
}

#[tokio::test]
async fn test_tool_timeout() {
    let mut registry = ToolRegistry::new().with_tool_timeout(Duration::from_millis(100));
    registry.register("slow", &stub()).await.unwrap();

    let err = registry
        .invoke("slow__sleep", json!({"ms": 2000}))
        .await
        .unwrap_err();
    assert_eq!(err, SystemError::Timeout(Duration::from_millis(100)));

    registry.shutdown().await;
}

#[tokio::test]
async fn test_tool_call_outlives_request_timeout() {
    let system = McpSystem::connect_with_timeout("slow", &stub(), Duration::from_millis(100))
        .await
        .unwrap();
    let mut registry = ToolRegistry::new().with_tool_timeout(Duration::from_secs(2));
    registry.register_system(Arc::new(system)).await.unwrap();

    let outcome = registry
        .invoke("slow__sleep", json!({"ms": 400, "text": "rested"}))
        .await
        .unwrap();
    assert_eq!(outcome.render_text(), "rested");

    registry.shutdown().await;
}

#[tokio::test]
async fn test_tool_call_without_timeout_waits() {
    let system = McpSystem::connect_with_timeout("slow", &stub(), Duration::from_millis(100))
        .await
        .unwrap();
    let mut registry = ToolRegistry::new();
    registry.register_system(Arc::new(system)).await.unwrap();

    let outcome = registry
        .invoke("slow__sleep", json!({"ms": 300}))
        .await
        .unwrap();
    assert_eq!(outcome.render_text(), "slept 300ms");

    registry.shutdown().await;
}

fn tool_responses(message: &Message) -> Vec<ToolResponse> {
    message
        .content
        .iter()
        .filter_map(|content| content.as_tool_response().cloned())
        .collect()
}

#[tokio::test]
async fn test_researcher_results_keep_request_order() {
    let mut registry = ToolRegistry::new();
    registry.register("slow", &stub()).await.unwrap();
    registry.register("fast", &stub()).await.unwrap();
    let registry = Arc::new(registry);

    let provider = Arc::new(MockProvider::new(vec![
        Completion::tool_use(
            Message::assistant()
                .with_tool_request(
                    "t1",
                    ToolCall::new("slow__sleep", json!({"ms": 300, "text": "first"})),
                )
                .with_tool_request("t2", ToolCall::new("fast__echo", json!({"text": "second"})))
                .with_tool_request("t3", ToolCall::new("fast__fail", json!({}))),
        ),
        Completion::text("done"),
    ]));

    let agent = Agent::new(AgentKind::Researcher, provider.clone(), registry.clone());
    assert_eq!(agent.reply("look it up", None).await.unwrap(), "done");

    let calls = provider.calls();
    let results = tool_responses(calls[1].messages.last().unwrap());
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t3"]);
    assert_eq!(results[0].content, "first");
    assert!(!results[0].is_error);
    assert_eq!(results[1].content, "second");
    assert!(results[2].is_error);
    assert!(results[2].content.contains("stub failure"));

    registry.shutdown().await;
}
