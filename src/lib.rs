//! Governed database gateway over the Model Context Protocol
//!
//! Exposes schema-introspecting, table-governed database access as MCP tools
//! and resources over line-delimited JSON-RPC.

pub mod chat;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod query;
pub mod resources;
pub mod store;
pub mod tools;
pub mod transport;
pub mod types;

// Test modules
#[cfg(test)]
pub mod tests;

// Re-export key types
pub use config::Configuration;
pub use self::core::McpServer;
pub use dispatcher::Dispatcher;
pub use error::{McpError, McpResult};
pub use protocol::McpProtocol;
pub use resources::ResourceRegistry;
pub use store::{DataStore, SqliteStore};
pub use tools::ToolRegistry;
