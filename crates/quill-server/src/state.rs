use quill::agent::AgentConfig;
use quill::providers::base::Provider;
use quill::systems::ToolRegistry;
use std::sync::Arc;

/// Shared application state
///
/// The registry is built once at startup; every request runs its own agents
/// against it.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<ToolRegistry>,
    pub agent_config: AgentConfig,
}
