//! MCP Protocol Implementation
//!
//! Message decoding and response envelope construction.

pub mod message;

pub use message::{InitializeParams, ParsedMessage, RawMessage, ResourceReadParams, ToolCallParams};

// Re-export the main protocol struct
pub use self::protocol::McpProtocol;

mod protocol {
    //! Protocol version, capabilities, and server information.

    use {
        serde_json::{json, Value},
        tracing::info,
    };

    pub const PROTOCOL_VERSION: &str = "2024-11-05";
    pub const SERVER_NAME: &str = "mcp-database-server";

    pub struct McpProtocol {
        version: String,
        server_name: String,
        server_version: String,
    }

    impl McpProtocol {
        pub fn new() -> Self {
            Self {
                version: PROTOCOL_VERSION.to_string(),
                server_name: SERVER_NAME.to_string(),
                server_version: env!("CARGO_PKG_VERSION").to_string(),
            }
        }

        /// Create initialization response
        pub fn create_initialize_response(&self, client_version: Option<&str>) -> Value {
            info!(
                client_protocol = ?client_version,
                server_protocol = %self.version,
                event = "initialize",
                "MCP client initializing"
            );
            json!({
                "protocolVersion": self.version,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version
                }
            })
        }

        /// Create success response
        pub fn create_success_response(&self, id: Value, result: Value) -> Value {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": result
            })
        }
    }

    impl Default for McpProtocol {
        fn default() -> Self {
            Self::new()
        }
    }

}
