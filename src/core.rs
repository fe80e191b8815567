//! MCP Server Core
//!
//! Ties configuration, the Data Store, and the dispatcher together and runs
//! the line transport over stdio or any other reader/writer pair.

use {
    crate::{
        config::Configuration,
        dispatcher::Dispatcher,
        error::McpResult,
        logging,
        store::DataStore,
        transport,
    },
    std::sync::Arc,
    tokio::io::{AsyncBufRead, AsyncWrite, BufReader},
    tracing::info,
};

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Create a new MCP server instance
    pub fn new(config: Configuration, store: Arc<dyn DataStore>) -> Self {
        info!(
            max_query_rows = config.max_query_rows,
            max_page_size = config.max_page_size,
            allowed_tables = config.allowed_tables.len(),
            blocked_tables = config.blocked_tables().len(),
            "Initializing MCP database server"
        );
        Self {
            dispatcher: Dispatcher::new(config, store),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve one connection over an arbitrary reader/writer pair.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        transport::serve(&self.dispatcher, reader, writer).await
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> McpResult<()> {
        let result = self
            .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await;
        logging::log_server_shutdown();
        result
    }
}
