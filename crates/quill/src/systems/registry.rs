use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::timeout;

use super::config::{SystemConfig, SystemsConfig};
use super::error::{ConnectError, SystemError, SystemResult};
use super::mcp::McpSystem;
use super::system::{System, ToolOutcome};
use crate::models::tool::{Tool, ToolCall};

/// Joins a system name and a tool's local name into its qualified name
pub const TOOL_NAME_SEPARATOR: &str = "__";

/// A tool offered by one system, under its registry wide name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub qualified_name: String,
    pub system_name: String,
    pub local_name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(system_name: &str, tool: Tool) -> Self {
        Self {
            qualified_name: format!("{}{}{}", system_name, TOOL_NAME_SEPARATOR, tool.name),
            system_name: system_name.to_string(),
            local_name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }
    }

    /// The tool as a model sees it
    pub fn to_tool(&self) -> Tool {
        Tool::new(
            &self.qualified_name,
            &self.description,
            self.input_schema.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Failed(String),
}

/// One registered system and its health
pub struct SystemConnection {
    name: String,
    system: Option<Arc<dyn System>>,
    status: RwLock<ConnectionStatus>,
}

impl SystemConnection {
    fn connected(system: Arc<dyn System>) -> Self {
        Self {
            name: system.name().to_string(),
            system: Some(system),
            status: RwLock::new(ConnectionStatus::Connected),
        }
    }

    fn failed(name: &str, reason: String) -> Self {
        Self {
            name: name.to_string(),
            system: None,
            status: RwLock::new(ConnectionStatus::Failed(reason)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    fn mark_failed(&self, reason: String) {
        tracing::warn!(system = %self.name, %reason, "system marked as failed");
        *self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = ConnectionStatus::Failed(reason);
    }

    fn live_system(&self) -> Option<&Arc<dyn System>> {
        if self.is_connected() {
            self.system.as_ref()
        } else {
            None
        }
    }
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    connection: usize,
}

/// The flat catalog of every tool offered by every connected system.
///
/// Built once at startup and then shared read only; the only state that changes
/// afterwards is the health of each connection.
#[derive(Default)]
pub struct ToolRegistry {
    connections: Vec<SystemConnection>,
    tools: IndexMap<String, ToolEntry>,
    tool_timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any tool call that takes longer than `tool_timeout`
    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = Some(tool_timeout);
        self
    }

    /// Connect every configured system. Systems that fail are skipped and reported.
    pub async fn from_config(configs: &SystemsConfig) -> (Self, Vec<ConnectError>) {
        let mut registry = Self::new();
        let errors = registry.register_all(configs).await;
        (registry, errors)
    }

    /// Register the configured systems in file order, returning the ones that failed.
    /// Entries the file could not describe are reported after the rest.
    pub async fn register_all(&mut self, configs: &SystemsConfig) -> Vec<ConnectError> {
        let mut errors = Vec::new();
        for (name, config) in &configs.systems {
            if let Err(err) = self.register(name, config).await {
                tracing::warn!(system = %name, error = %err, "skipping system");
                errors.push(err);
            }
        }
        for (name, reason) in &configs.invalid {
            let err = ConnectError::new(name, format!("invalid configuration: {reason}"));
            tracing::warn!(system = %name, error = %err, "skipping system");
            self.connections
                .push(SystemConnection::failed(name, err.reason.clone()));
            errors.push(err);
        }
        errors
    }

    /// Launch a stdio system from its config and add its tools
    pub async fn register(
        &mut self,
        name: &str,
        config: &SystemConfig,
    ) -> Result<&SystemConnection, ConnectError> {
        self.validate_name(name)?;
        match McpSystem::connect(name, config).await {
            Ok(system) => self.register_system(Arc::new(system)).await,
            Err(err) => {
                self.connections
                    .push(SystemConnection::failed(name, err.reason.clone()));
                Err(err)
            }
        }
    }

    /// Add an already connected system and its tools
    pub async fn register_system(
        &mut self,
        system: Arc<dyn System>,
    ) -> Result<&SystemConnection, ConnectError> {
        let name = system.name().to_string();
        self.validate_name(&name)?;

        let descriptors = match Self::discover_tools(system.as_ref()).await {
            Ok(descriptors) => descriptors,
            Err(err) => {
                system.close().await;
                self.connections
                    .push(SystemConnection::failed(&name, err.to_string()));
                return Err(ConnectError::new(name, err));
            }
        };

        let index = self.connections.len();
        for descriptor in descriptors {
            if self.tools.contains_key(&descriptor.qualified_name) {
                tracing::warn!(tool = %descriptor.qualified_name, "ignoring duplicate tool name");
                continue;
            }
            self.tools.insert(
                descriptor.qualified_name.clone(),
                ToolEntry {
                    descriptor,
                    connection: index,
                },
            );
        }
        self.connections.push(SystemConnection::connected(system));

        tracing::info!(
            system = %name,
            tools = self.tools.values().filter(|entry| entry.connection == index).count(),
            "registered system"
        );
        Ok(&self.connections[index])
    }

    /// List a system's tools namespaced under the system's name, in the order it reports them
    pub async fn discover_tools(system: &dyn System) -> SystemResult<Vec<ToolDescriptor>> {
        let tools = system.list_tools().await?;
        let mut descriptors: Vec<ToolDescriptor> = Vec::with_capacity(tools.len());
        for tool in tools {
            if descriptors.iter().any(|d| d.local_name == tool.name) {
                tracing::warn!(system = %system.name(), tool = %tool.name, "system listed a tool twice");
                continue;
            }
            descriptors.push(ToolDescriptor::new(system.name(), tool));
        }
        Ok(descriptors)
    }

    fn validate_name(&self, name: &str) -> Result<(), ConnectError> {
        if name.is_empty() {
            return Err(ConnectError::new(name, "system name is empty"));
        }
        if name.contains(TOOL_NAME_SEPARATOR) {
            return Err(ConnectError::new(
                name,
                format!("system name must not contain '{}'", TOOL_NAME_SEPARATOR),
            ));
        }
        // A trailing '_' would let "a_" + "b" and "a" + "_b" share a qualified name
        if name.ends_with('_') {
            return Err(ConnectError::new(name, "system name must not end with '_'"));
        }
        if self.connections.iter().any(|c| c.name == name) {
            return Err(ConnectError::new(name, "a system with this name is already registered"));
        }
        Ok(())
    }

    /// Every tool of every connected system, in registration then discovery order
    pub fn list_all(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .filter(|entry| self.connections[entry.connection].is_connected())
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// [`Self::list_all`] in the shape handed to a model
    pub fn tools(&self) -> Vec<Tool> {
        self.list_all().iter().map(ToolDescriptor::to_tool).collect()
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(qualified_name).map(|entry| &entry.descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call a tool by its qualified name on the system that owns it
    pub async fn invoke(&self, qualified_name: &str, arguments: Value) -> SystemResult<ToolOutcome> {
        let entry = self
            .tools
            .get(qualified_name)
            .ok_or_else(|| SystemError::ToolNotFound(qualified_name.to_string()))?;
        let connection = &self.connections[entry.connection];
        let system = connection
            .live_system()
            .ok_or_else(|| SystemError::ProviderUnavailable(connection.name.clone()))?;

        let call = ToolCall::new(&entry.descriptor.local_name, arguments);
        tracing::debug!(system = %connection.name, tool = %call.name, "calling tool");

        let result = match self.tool_timeout {
            Some(limit) => timeout(limit, system.call(call))
                .await
                .unwrap_or(Err(SystemError::Timeout(limit))),
            None => system.call(call).await,
        };

        if let Err(SystemError::Transport(reason)) = &result {
            connection.mark_failed(reason.clone());
        }
        result
    }

    /// The name and health of every system that was registered, failed ones included
    pub fn statuses(&self) -> Vec<(String, ConnectionStatus)> {
        self.connections
            .iter()
            .map(|connection| (connection.name.clone(), connection.status()))
            .collect()
    }

    /// Close every system's transport
    pub async fn shutdown(&self) {
        for connection in &self.connections {
            if let Some(system) = &connection.system {
                system.close().await;
            }
        }
    }
}
