mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Context;
use quill::providers::{base::Provider, factory};
use quill::systems::{SystemsConfig, ToolRegistry};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = configuration::Settings::new()?;
    let provider_type = settings.provider.provider_type();
    let provider: Arc<dyn Provider> =
        Arc::from(factory::get_provider(settings.provider.into_config())?);
    info!(provider = %provider_type, "model provider ready");

    // Connect every configured system; failures are logged and skipped
    let systems = SystemsConfig::load(&settings.systems_file)?;
    let mut registry = ToolRegistry::new();
    if let Some(limit) = settings.agent.tool_timeout() {
        registry = registry.with_tool_timeout(limit);
    }
    for err in registry.register_all(&systems).await {
        tracing::warn!(system = %err.system, reason = %err.reason, "system not available");
    }
    let registry = Arc::new(registry);
    info!(tools = registry.list_all().len(), "tool registry ready");

    let state = state::AppState {
        provider,
        registry: registry.clone(),
        agent_config: settings.agent.agent_config(),
    };
    let app = routes::app(state, settings.server.static_dir.as_deref());

    let addr = settings
        .server
        .socket_addr()
        .context("invalid server host or port")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down systems");
    registry.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
