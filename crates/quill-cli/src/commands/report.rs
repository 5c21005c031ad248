use anyhow::{Context, Result};
use cliclack::spinner;
use console::style;
use quill::agent::{AgentConfig, AgentKind};
use quill::pipeline::{Pipeline, PipelineContext};
use quill::providers::base::Provider;
use quill::systems::ToolRegistry;
use std::path::Path;
use std::sync::Arc;

fn stage_labels(kind: AgentKind) -> (&'static str, &'static str) {
    match kind {
        AgentKind::Researcher => ("Researching", "Research gathered"),
        AgentKind::Analyzer => ("Analyzing", "Analysis complete"),
        AgentKind::Writer => ("Writing report", "Report written"),
    }
}

pub async fn execute(
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    topic: &str,
    output: Option<&Path>,
) -> Result<()> {
    let pipeline = Pipeline::new(provider, registry).with_config(config);

    // Each stage reads the previous stage's answer
    let mut message = topic.to_string();
    let mut context = PipelineContext::default();
    for kind in [AgentKind::Researcher, AgentKind::Analyzer, AgentKind::Writer] {
        let (running, done) = stage_labels(kind);
        let spin = spinner();
        spin.start(format!("{}...", running));
        match pipeline.run_stage(kind, &message, context).await {
            Ok(answer) => {
                spin.stop(done);
                context = PipelineContext {
                    prior_output: Some(answer.clone()),
                };
                message = answer;
            }
            Err(err) => {
                spin.stop(style(&err).red());
                return Err(err.into());
            }
        }
    }

    match output {
        Some(path) => {
            write_report(path, &message)?;
            println!("{} {}", style("Report saved to").dim(), path.display());
            Ok(())
        }
        None => super::render_markdown(&message),
    }
}

fn write_report(path: &Path, report: &str) -> Result<()> {
    std::fs::write(path, report)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill::providers::base::Completion;
    use quill::providers::mock::MockProvider;

    #[tokio::test]
    async fn test_report_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        let provider = Arc::new(MockProvider::new(vec![
            Completion::text("research"),
            Completion::text("analysis"),
            Completion::text("# Report"),
        ]));

        execute(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig::default(),
            "quantum computing",
            Some(&path),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report");
        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].messages[0].text(), "quantum computing");
        assert_eq!(calls[2].messages[0].text(), "analysis");
    }

    #[tokio::test]
    async fn test_failed_stage_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        let provider = Arc::new(MockProvider::new(vec![Completion::text("research")]));

        let err = execute(
            provider,
            Arc::new(ToolRegistry::new()),
            AgentConfig::default(),
            "quantum computing",
            Some(&path),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("analyzer stage failed"));
        assert!(!path.exists());
    }
}
