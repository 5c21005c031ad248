use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::agent::{Agent, AgentConfig, AgentKind};
use crate::errors::PipelineError;
use crate::providers::base::Provider;
use crate::systems::ToolRegistry;

/// What one stage hands to the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    pub prior_output: Option<String>,
}

/// The output of every stage of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub research: String,
    pub analysis: String,
    pub report: String,
}

/// Runs researcher, analyzer and writer in sequence, each seeded with the previous stage's answer
pub struct Pipeline {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Produce a report on `topic`
    pub async fn run(&self, topic: &str) -> Result<String, PipelineError> {
        Ok(self.run_stages(topic).await?.report)
    }

    /// Like [`Self::run`], keeping the intermediate research and analysis
    pub async fn run_stages(&self, topic: &str) -> Result<PipelineOutput, PipelineError> {
        let research = self
            .run_stage(AgentKind::Researcher, topic, PipelineContext::default())
            .await?;
        let analysis = self
            .run_stage(
                AgentKind::Analyzer,
                &research,
                PipelineContext {
                    prior_output: Some(research.clone()),
                },
            )
            .await?;
        let report = self
            .run_stage(
                AgentKind::Writer,
                &analysis,
                PipelineContext {
                    prior_output: Some(analysis.clone()),
                },
            )
            .await?;

        Ok(PipelineOutput {
            research,
            analysis,
            report,
        })
    }

    /// Run one stage on its own
    pub async fn run_stage(
        &self,
        kind: AgentKind,
        message: &str,
        context: PipelineContext,
    ) -> Result<String, PipelineError> {
        let agent = Agent::new(kind, self.provider.clone(), self.registry.clone())
            .with_config(self.config.clone());

        tracing::info!(stage = %kind, "stage started");
        let started = Instant::now();
        let result = agent.reply(message, context.prior_output.as_deref()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                tracing::info!(stage = %kind, elapsed_ms, chars = output.len(), "stage finished");
                Ok(output)
            }
            Err(source) => {
                tracing::error!(stage = %kind, elapsed_ms, error = %source, "stage failed");
                Err(PipelineError {
                    stage: kind,
                    source,
                })
            }
        }
    }
}
