use anyhow::Result;
use console::style;
use quill::systems::{ConnectionStatus, ToolRegistry};
use serde_json::json;
use std::fmt::Write;

pub fn execute(registry: &ToolRegistry, as_json: bool) -> Result<()> {
    if as_json {
        let mut systems = Vec::new();
        for (name, status) in registry.statuses() {
            let mut entry = serde_json::to_value(&status)?;
            entry["name"] = json!(name);
            systems.push(entry);
        }
        let catalog = json!({ "tools": registry.list_all(), "systems": systems });
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        print!("{}", describe(registry));
    }
    Ok(())
}

/// Human readable catalog, grouped by system in registration order
fn describe(registry: &ToolRegistry) -> String {
    let statuses = registry.statuses();
    if statuses.is_empty() {
        return format!("{}\n", style("No systems configured").dim());
    }

    let tools = registry.list_all();
    let mut out = String::new();
    for (name, status) in statuses {
        match status {
            ConnectionStatus::Connected => {
                let _ = writeln!(out, "{} {}", style("●").green(), style(&name).bold());
                for tool in tools.iter().filter(|tool| tool.system_name == name) {
                    let _ = writeln!(
                        out,
                        "    {}  {}",
                        style(&tool.qualified_name).cyan(),
                        style(&tool.description).dim()
                    );
                }
            }
            ConnectionStatus::Failed(reason) => {
                let _ = writeln!(
                    out,
                    "{} {}  {}",
                    style("●").red(),
                    style(&name).bold(),
                    style(reason).red()
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill::models::tool::{Tool, ToolCall};
    use quill::systems::{System, SystemConfig, SystemResult, ToolOutcome};
    use std::sync::Arc;

    struct EchoSystem;

    #[async_trait]
    impl System for EchoSystem {
        fn name(&self) -> &str {
            "echo"
        }

        async fn list_tools(&self) -> SystemResult<Vec<Tool>> {
            Ok(vec![Tool::new("say", "Repeat the input", json!({"type": "object"}))])
        }

        async fn call(&self, _tool_call: ToolCall) -> SystemResult<ToolOutcome> {
            Ok(ToolOutcome::text("said"))
        }
    }

    #[tokio::test]
    async fn test_describe_lists_tools_and_failures() {
        console::set_colors_enabled(false);
        let mut registry = ToolRegistry::new();
        registry.register_system(Arc::new(EchoSystem)).await.unwrap();
        registry
            .register("ghost", &SystemConfig::new("quill-definitely-not-a-real-command"))
            .await
            .err()
            .unwrap();

        let text = describe(&registry);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "● echo");
        assert_eq!(lines[1], "    echo__say  Repeat the input");
        assert!(lines[2].starts_with("● ghost  "));
    }

    #[test]
    fn test_describe_empty_registry() {
        console::set_colors_enabled(false);
        assert_eq!(describe(&ToolRegistry::new()), "No systems configured\n");
    }
}
