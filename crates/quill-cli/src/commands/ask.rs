use anyhow::Result;
use cliclack::spinner;
use console::style;
use quill::agent::{Agent, AgentConfig, AgentKind};
use quill::providers::base::Provider;
use quill::systems::ToolRegistry;
use std::sync::Arc;

pub async fn execute(
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    kind: AgentKind,
    message: &str,
    context: Option<&str>,
) -> Result<()> {
    let answer = ask(provider, registry, config, kind, message, context).await?;
    super::render_markdown(&answer)
}

async fn ask(
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    kind: AgentKind,
    message: &str,
    context: Option<&str>,
) -> Result<String> {
    let agent = Agent::new(kind, provider, registry).with_config(config);

    let spin = spinner();
    spin.start(format!("awaiting the {}", kind));
    match agent.reply(message, context).await {
        Ok(answer) => {
            spin.stop(format!("{} replied", kind));
            Ok(answer)
        }
        Err(err) => {
            spin.stop(style(&err).red());
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill::agent::CONTEXT_ACKNOWLEDGEMENT;
    use quill::providers::base::Completion;
    use quill::providers::mock::MockProvider;

    #[tokio::test]
    async fn test_ask_with_context() {
        let provider = Arc::new(MockProvider::new(vec![Completion::text("a summary")]));

        let answer = ask(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig::default(),
            AgentKind::Writer,
            "summarize",
            Some("some notes"),
        )
        .await
        .unwrap();

        assert_eq!(answer, "a summary");
        let calls = provider.calls();
        assert_eq!(calls[0].messages[0].text(), "some notes");
        assert_eq!(calls[0].messages[1].text(), CONTEXT_ACKNOWLEDGEMENT);
        assert_eq!(calls[0].messages[2].text(), "summarize");
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let provider = Arc::new(MockProvider::new(vec![]));

        let err = ask(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig::default(),
            AgentKind::Researcher,
            "   ",
            None,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("Invalid request"));
        assert!(provider.calls().is_empty());
    }
}
