//! Systems are external tool providers. Each one is connected once at startup and
//! its tools are exposed to the agents through the [`ToolRegistry`].
pub mod config;
pub mod error;
pub mod mcp;
pub mod registry;
pub mod system;

pub use config::{SystemConfig, SystemsConfig};
pub use error::{ConnectError, SystemError, SystemResult};
pub use registry::{ConnectionStatus, ToolDescriptor, ToolRegistry, TOOL_NAME_SEPARATOR};
pub use system::{System, ToolContent, ToolOutcome};
