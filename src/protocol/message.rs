//! JSON-RPC message decoding
//!
//! A line is first decoded into a [`RawMessage`] whose `params` stay as
//! borrowed raw JSON, then turned into a [`ParsedMessage`] once the method is
//! known. Only the params of the chosen method are ever deserialized.

use {
    crate::error::{McpError, McpResult},
    serde::{Deserialize, Serialize},
    serde_json::{value::RawValue, Map, Value},
};

/// Raw JSON-RPC message with lazy params.
///
/// `id` and `method` are kept as generic values so that a message with a
/// wrongly typed method can still be answered with its own id.
#[derive(Debug, Deserialize)]
pub struct RawMessage<'a> {
    #[serde(default)]
    pub jsonrpc: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<Value>,
    #[serde(borrow, default)]
    pub params: Option<&'a RawValue>,
}

/// Parsed and validated MCP message
#[derive(Debug)]
pub enum ParsedMessage {
    Initialize(InitializeParams),
    ToolsList,
    ToolsCall(ToolCallParams),
    ResourcesList,
    ResourcesRead(ResourceReadParams),
}

/// Informational only; initialization never gates other methods.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<Value>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolCallParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResourceReadParams {
    #[serde(default)]
    pub uri: Option<String>,
}

impl<'a> RawMessage<'a> {
    /// Decode one line. Anything but a JSON object is a parse error.
    pub fn from_slice(bytes: &'a [u8]) -> McpResult<Self> {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => {}
            Some(_) => return Err(McpError::Parse("message must be a JSON object".into())),
            None => return Err(McpError::Parse("empty message".into())),
        }
        serde_json::from_slice(bytes).map_err(|e| McpError::Parse(e.to_string()))
    }

    /// Method name, if present and a string.
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_ref().and_then(Value::as_str)
    }

    /// The id to echo back; absent ids are answered with `null`.
    pub fn id_value(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    pub fn has_id(&self) -> bool {
        self.id.as_ref().is_some_and(|id| !id.is_null())
    }

    /// A notification is an id-less `notifications/*` message.
    pub fn is_notification(&self) -> bool {
        !self.has_id() && self.method_name().is_some_and(|m| m.starts_with("notifications/"))
    }

    /// Resolve the method and deserialize its params. Notifications are
    /// filtered out before this; one that carries an id is an unknown method.
    pub fn parse_params(&self) -> McpResult<ParsedMessage> {
        let method = match &self.method {
            Some(Value::String(m)) => m.as_str(),
            Some(other) => return Err(McpError::UnknownMethod(other.to_string())),
            None => return Err(McpError::UnknownMethod("<missing>".into())),
        };

        match method {
            "initialize" => Ok(ParsedMessage::Initialize(self.params_or_default(method)?)),
            "tools/list" => Ok(ParsedMessage::ToolsList),
            "tools/call" => Ok(ParsedMessage::ToolsCall(self.params_or_default(method)?)),
            "resources/list" => Ok(ParsedMessage::ResourcesList),
            "resources/read" => Ok(ParsedMessage::ResourcesRead(self.params_or_default(method)?)),
            _ => Err(McpError::UnknownMethod(method.to_string())),
        }
    }

    fn params_or_default<T>(&self, method: &str) -> McpResult<T>
    where
        T: Default + for<'de> Deserialize<'de>,
    {
        match self.params {
            None => Ok(T::default()),
            Some(raw) if raw.get().trim() == "null" => Ok(T::default()),
            Some(raw) => serde_json::from_str(raw.get())
                .map_err(|e| McpError::InvalidParams(format!("{method}: {e}"))),
        }
    }
}
