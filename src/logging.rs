//! MCP Debug Logging Module
//!
//! Structured logging for the gateway using the tracing crate. Everything is
//! written to stderr; stdout carries protocol traffic only.

use {
    serde_json::Value,
    std::time::{Duration, Instant},
    tracing::{debug, error, info, span, trace, warn, Level, Span},
    tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter},
    uuid::Uuid,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate. `LOG_FORMAT=json` switches to structured JSON lines.
pub fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dbmcp={log_level},dbmcp_server={log_level}")));

    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    // A subscriber may already be installed (tests, embedding binaries)
    if result.is_ok() {
        info!(log_level = %log_level, "Tracing initialized");
    }
}

#[derive(Debug, Clone)]
pub struct McpConnectionId(pub String);

impl McpConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for McpConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for McpConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Create a span for tracking a connection lifecycle
pub fn connection_span(connection_id: &McpConnectionId) -> Span {
    span!(
        Level::INFO,
        "mcp_connection",
        connection_id = %connection_id,
        start_time = ?Instant::now()
    )
}

/// Create a span for tracking a request
pub fn request_span(method: &str, id: Option<&Value>) -> Span {
    span!(
        Level::INFO,
        "mcp_request",
        method = %method,
        request_id = ?id,
    )
}

pub fn log_connection_opened(connection_id: &McpConnectionId) {
    info!(
        connection_id = %connection_id,
        event = "connection_opened",
        "Line transport started"
    );
}

pub fn log_connection_closed(connection_id: &McpConnectionId, duration: Duration, messages: u64) {
    info!(
        connection_id = %connection_id,
        event = "connection_closed",
        duration_ms = duration.as_millis(),
        messages = messages,
        "Connection closed"
    );
}

/// Log message events
pub fn log_message_received(message_size: usize) {
    debug!(
        message_size = message_size,
        event = "message_received",
        "Received message"
    );
}

pub fn log_message_parsed(method: &str, id: Option<&Value>) {
    trace!(
        method = %method,
        message_id = ?id,
        event = "message_parsed",
        "Parsed message"
    );
}

pub fn log_notification(method: &str) {
    debug!(
        method = %method,
        event = "notification",
        "Notification received, no response"
    );
}

pub fn log_handler_success(method: &str, duration: Duration) {
    info!(
        method = %method,
        duration_ms = duration.as_millis(),
        event = "handler_success",
        "Successfully handled method"
    );
}

pub fn log_handler_error(method: &str, error: &str, duration: Duration) {
    error!(
        method = %method,
        error = %error,
        duration_ms = duration.as_millis(),
        event = "handler_error",
        "Failed to handle method"
    );
}

pub fn log_handler_panic(detail: &str) {
    error!(
        detail = %detail,
        event = "handler_panic",
        "Request handling panicked"
    );
}

/// Log response events
pub fn log_response_sent(response_size: usize) {
    debug!(
        response_size = response_size,
        event = "response_sent",
        "Sent response"
    );
}

/// Log tool events
pub fn log_tool_call(tool: &str, arg_count: usize) {
    info!(
        tool = %tool,
        arg_count = arg_count,
        event = "tool_call",
        "Tool call requested"
    );
}

pub fn log_unknown_tool(tool: &str) {
    warn!(
        tool = %tool,
        event = "unknown_tool",
        "Unknown tool requested"
    );
}

pub fn log_tool_failure(tool: &str, error: &str) {
    warn!(
        tool = %tool,
        error = %error,
        event = "tool_failure",
        "Tool returned a failure"
    );
}

pub fn log_table_denied(table: &str) {
    warn!(
        table = %table,
        event = "table_denied",
        "Access to table denied by configuration"
    );
}

pub fn log_query(sql: &str, limit: usize) {
    info!(
        sql = %sql,
        limit = limit,
        event = "query",
        "Executing query"
    );
}

/// Log resource events
pub fn log_resource_read(uri: &str) {
    info!(
        uri = %uri,
        event = "resource_read",
        "Resource read requested"
    );
}

/// Log error events with context
pub fn log_parse_error(error: &str, raw_message: &str) {
    error!(
        error = %error,
        raw_message = %raw_message,
        event = "parse_error",
        "Failed to parse message"
    );
}

pub fn log_unknown_method(method: &str) {
    warn!(
        method = %method,
        event = "unknown_method",
        "Unknown MCP method requested"
    );
}

/// Server lifecycle logging
pub fn log_server_startup(database: &str) {
    info!(
        database = %database,
        event = "server_startup",
        "Starting MCP database server"
    );
}

pub fn log_server_shutdown() {
    info!(event = "server_shutdown", "MCP database server shutting down");
}

#[macro_export]
macro_rules! log_tool_execution {
    ($tool_name:expr, $duration:expr, $result:expr) => {
        match $result {
            Ok(_) => tracing::debug!(
                tool = $tool_name,
                duration_ms = $duration.as_millis(),
                event = "tool_execution_success",
                "Tool executed"
            ),
            Err(e) => tracing::debug!(
                tool = $tool_name,
                duration_ms = $duration.as_millis(),
                error = %e,
                event = "tool_execution_error",
                "Tool execution failed"
            ),
        }
    };
}
