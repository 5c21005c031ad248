//! These models represent the objects passed around by the agents
//!
//! There are several different related formats we need to interact with:
//! - anthropic messages/tools, sent from the agent to the LLM
//! - openai messages/tools, sent from the agent to the LLM
//! - MCP tool listings and tool call results, exchanged with the connected systems
//! - the JSON bodies of the HTTP api
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the agent loop only ever sees these types.
pub mod message;
pub mod role;
pub mod tool;
