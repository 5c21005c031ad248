mod commands;
mod provider;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quill::agent::{AgentConfig, AgentKind, DEFAULT_MAX_TURNS};
use quill::systems::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::provider::ProviderArgs;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    /// JSON file listing the tool systems to launch
    #[arg(long, env = "QUILL_SYSTEMS_FILE", default_value = "systems.json", global = true)]
    systems_file: PathBuf,

    /// Model calls allowed per agent run
    #[arg(long, env = "QUILL_MAX_TURNS", default_value_t = DEFAULT_MAX_TURNS, global = true)]
    max_turns: usize,

    /// Seconds to wait for a single tool call (0 waits forever)
    #[arg(long, env = "QUILL_TOOL_TIMEOUT", default_value_t = 60, global = true)]
    tool_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Research, analyze and write a report on a topic
    Report {
        /// What the report should be about
        topic: String,

        /// Write the report to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send one message to a single agent
    Ask {
        /// researcher, analyzer or writer
        #[arg(value_parser = AgentKind::parse)]
        agent: AgentKind,

        message: String,

        /// Text the agent should read before the message
        #[arg(short, long)]
        context: Option<String>,
    },

    /// List the tools offered by the configured systems
    Tools {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_turns: self.max_turns,
            ..AgentConfig::default()
        }
    }

    fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout > 0).then(|| Duration::from_secs(self.tool_timeout))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = commands::connect_systems(&cli.systems_file, cli.tool_timeout()).await?;
    let result = run(&cli, registry.clone()).await;
    registry.shutdown().await;
    result
}

async fn run(cli: &Cli, registry: Arc<ToolRegistry>) -> Result<()> {
    match &cli.command {
        Command::Report { topic, output } => {
            commands::report::execute(
                cli.provider.build()?,
                registry,
                cli.agent_config(),
                topic,
                output.as_deref(),
            )
            .await
        }
        Command::Ask {
            agent,
            message,
            context,
        } => {
            commands::ask::execute(
                cli.provider.build()?,
                registry,
                cli.agent_config(),
                *agent,
                message,
                context.as_deref(),
            )
            .await
        }
        Command::Tools { json } => commands::tools::execute(&registry, *json),
    }
}
