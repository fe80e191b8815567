//! Core types for the MCP protocol
//!
//! Wire-level definitions shared by the registries and the dispatcher.

use {
    crate::store::Row,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// Definition of a tool that can be called
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    pub input_schema: Value,
}

/// Definition of a resource that can be accessed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// The URI of the resource
    pub uri: String,
    /// A human-readable name for the resource
    pub name: String,
    /// A description of the resource
    pub description: String,
    /// The MIME type of the resource content
    pub mime_type: String,
}

/// One entry of a `tools/call` result's `content` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

/// One entry of a `resources/read` result's `contents` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// Uniform envelope returned by every tool handler.
///
/// Successful results always carry `data` and `row_count`; failures always
/// carry `error`. Tool-specific fields are flattened next to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryResult {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self::values(rows.into_iter().map(Value::Object).collect())
    }

    pub fn values(data: Vec<Value>) -> Self {
        Self {
            success: true,
            row_count: Some(data.len()),
            data: Some(data),
            error: None,
            extra: Map::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            row_count: None,
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    /// Attach a tool-specific field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn rows_slice(&self) -> &[Value] {
        self.data.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition_wire_names() {
        let def = ToolDefinition {
            name: "list_tables".into(),
            description: "d".into(),
            input_schema: json!({"type": "object"}),
        };
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["inputSchema"]["type"], "object");
        assert!(v.get("input_schema").is_none());
    }

    #[test]
    fn test_failure_envelope_shape() {
        let v = serde_json::to_value(QueryResult::failure("Unknown tool: nope")).unwrap();
        assert_eq!(v, json!({"success": false, "error": "Unknown tool: nope"}));
    }

    #[test]
    fn test_success_envelope_flattens_extras() {
        let mut row = Row::new();
        row.insert("id".into(), json!(1));
        let v = serde_json::to_value(QueryResult::rows(vec![row]).with("table_name", "account")).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["row_count"], 1);
        assert_eq!(v["data"][0]["id"], 1);
        assert_eq!(v["table_name"], "account");
        assert!(v.get("error").is_none());
    }

    #[test]
    fn test_text_content_tag() {
        let v = serde_json::to_value(Content::Text { text: "{}".into() }).unwrap();
        assert_eq!(v, json!({"type": "text", "text": "{}"}));
    }
}
