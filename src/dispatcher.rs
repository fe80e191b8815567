//! Request routing
//!
//! Turns one decoded line into at most one response. The dispatcher holds no
//! per-connection state; everything it owns is read-only after construction.

use {
    crate::{
        config::Configuration,
        error::{McpError, McpResult},
        logging,
        protocol::{McpProtocol, ParsedMessage, RawMessage},
        resources::ResourceRegistry,
        store::DataStore,
        tools::{ToolContext, ToolRegistry},
        types::Content,
    },
    serde_json::{json, Map, Value},
    std::{sync::Arc, time::Instant},
    tracing::Instrument,
};

pub struct Dispatcher {
    protocol: McpProtocol,
    config: Configuration,
    store: Arc<dyn DataStore>,
    tools: ToolRegistry,
    resources: ResourceRegistry,
}

impl Dispatcher {
    pub fn new(config: Configuration, store: Arc<dyn DataStore>) -> Self {
        Self {
            protocol: McpProtocol::new(),
            tools: ToolRegistry::new(&config),
            resources: ResourceRegistry::new(),
            config,
            store,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    fn context(&self) -> ToolContext<'_> {
        ToolContext {
            config: &self.config,
            store: self.store.as_ref(),
        }
    }

    /// Handle one raw line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &[u8]) -> Option<Value> {
        logging::log_message_received(line.len());
        let message = match RawMessage::from_slice(line) {
            Ok(message) => message,
            Err(e) => {
                logging::log_parse_error(&e.to_string(), &String::from_utf8_lossy(line));
                return Some(e.to_json_rpc_error(None));
            }
        };
        self.handle_message(&message).await
    }

    /// Handle an already decoded message.
    pub async fn handle_message(&self, message: &RawMessage<'_>) -> Option<Value> {
        let method = message.method_name().unwrap_or("<missing>").to_string();
        let id = message.id_value();
        logging::log_message_parsed(&method, message.id.as_ref());

        if message.is_notification() {
            logging::log_notification(&method);
            return None;
        }

        let span = logging::request_span(&method, message.id.as_ref());
        let start = Instant::now();
        let outcome = self.route(message).instrument(span).await;

        match outcome {
            Ok(result) => {
                logging::log_handler_success(&method, start.elapsed());
                Some(self.protocol.create_success_response(id, result))
            }
            Err(e) => {
                match &e {
                    McpError::UnknownMethod(m) => logging::log_unknown_method(m),
                    _ => logging::log_handler_error(&method, &e.to_string(), start.elapsed()),
                }
                Some(e.to_json_rpc_error(Some(id)))
            }
        }
    }

    async fn route(&self, message: &RawMessage<'_>) -> McpResult<Value> {
        match message.parse_params()? {
            ParsedMessage::Initialize(params) => Ok(self
                .protocol
                .create_initialize_response(params.protocol_version.as_deref())),
            ParsedMessage::ToolsList => Ok(self.tools.list()),
            ParsedMessage::ToolsCall(params) => {
                let name = params.name.unwrap_or_default();
                let arguments = params.arguments.unwrap_or_default();
                self.call_tool(&name, &arguments).await
            }
            ParsedMessage::ResourcesList => Ok(self.resources.list()),
            ParsedMessage::ResourcesRead(params) => {
                let uri = params.uri.unwrap_or_default();
                Ok(self.resources.read_contents(&uri, self.store.as_ref()).await)
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> McpResult<Value> {
        let result = self.tools.call(name, arguments, &self.context()).await;
        let text = serde_json::to_string(&result)?;
        Ok(json!({ "content": [Content::Text { text }] }))
    }
}
