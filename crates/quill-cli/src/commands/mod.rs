pub mod ask;
pub mod report;
pub mod tools;

use anyhow::{Context, Result};
use bat::WrappingMode;
use quill::systems::{SystemsConfig, ToolRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Launch every system listed in `path`; systems that fail to start are logged and skipped
pub async fn connect_systems(
    path: &Path,
    tool_timeout: Option<Duration>,
) -> Result<Arc<ToolRegistry>> {
    let systems = SystemsConfig::load(path)
        .with_context(|| format!("failed to load systems from {}", path.display()))?;

    let mut registry = ToolRegistry::new();
    if let Some(limit) = tool_timeout {
        registry = registry.with_tool_timeout(limit);
    }
    for err in registry.register_all(&systems).await {
        tracing::warn!(system = %err.system, reason = %err.reason, "system not available");
    }
    Ok(Arc::new(registry))
}

/// Print markdown to the terminal with syntax highlighting
pub fn render_markdown(content: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()
        .map_err(|e| anyhow::anyhow!("failed to render output: {}", e))?;
    println!();
    Ok(())
}
