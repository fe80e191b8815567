use serde_json::Value;
use thiserror::Error;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Error)]
pub enum McpError {
    // Protocol Errors
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("Internal error: invalid params: {0}")]
    InvalidParams(String),

    // IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON Errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal Errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Parse(_) => PARSE_ERROR,
            Self::UnknownMethod(_) => METHOD_NOT_FOUND,
            // Malformed params are a handling fault, not a distinct protocol outcome
            _ => INTERNAL_ERROR,
        }
    }

    /// Create JSON-RPC error response
    pub fn to_json_rpc_error(&self, id: Option<Value>) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
            "id": id,
        })
    }
}

// Result type alias for convenience
pub type McpResult<T> = Result<T, McpError>;

/// Failures raised by a [`crate::store::DataStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Failures inside a tool handler. These never leave the tool registry;
/// they are rendered into a failed `QueryResult`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument '{0}': {1}")]
    InvalidArgument(&'static str, &'static str),

    #[error("Access to table '{0}' is not allowed")]
    TableNotAllowed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid blocked table pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
