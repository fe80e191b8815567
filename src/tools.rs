//! MCP Tools Implementation
//!
//! The fixed tool catalog and one handler per tool. Every handler returns a
//! [`QueryResult`]; failures are folded into it and never propagate.

use {
    crate::{
        chat,
        config::{coerce_count, Configuration},
        error::{StoreError, ToolError},
        logging,
        query::GovernedQuery,
        store::{DataStore, Row},
        types::{QueryResult, ToolDefinition},
    },
    serde::Serialize,
    serde_json::{json, Map, Value},
    std::{collections::HashMap, time::Instant},
};

/// Everything a handler may consult while running.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub config: &'a Configuration,
    pub store: &'a dyn DataStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolHandler {
    AiChat,
    ExecuteQuery,
    QueryTable,
    ListTables,
    DescribeTable,
    GetTableData,
}

/// Immutable name → (definition, handler) catalog built once at startup.
pub struct ToolRegistry {
    tools: Vec<(ToolDefinition, ToolHandler)>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(config: &Configuration) -> Self {
        let tools = vec![
            (ai_chat_definition(), ToolHandler::AiChat),
            (execute_query_definition(config), ToolHandler::ExecuteQuery),
            (query_table_definition(config), ToolHandler::QueryTable),
            (list_tables_definition(), ToolHandler::ListTables),
            (describe_table_definition(), ToolHandler::DescribeTable),
            (get_table_data_definition(config), ToolHandler::GetTableData),
        ];
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, (def, _))| (def.name.clone(), i))
            .collect();
        Self { tools, index }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|(def, _)| def)
    }

    pub fn handler(&self, name: &str) -> Option<ToolHandler> {
        self.index.get(name).map(|&i| self.tools[i].1)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `tools/list` result
    pub fn list(&self) -> Value {
        json!({ "tools": self.definitions().collect::<Vec<_>>() })
    }

    /// Execute a tool by name
    pub async fn call(&self, name: &str, arguments: &Map<String, Value>, ctx: &ToolContext<'_>) -> QueryResult {
        let Some(handler) = self.handler(name) else {
            logging::log_unknown_tool(name);
            return QueryResult::failure(format!("Unknown tool: {name}"));
        };

        logging::log_tool_call(name, arguments.len());
        let start = Instant::now();
        let outcome = handler.invoke(ToolArgs::new(arguments), ctx).await;
        crate::log_tool_execution!(name, start.elapsed(), &outcome);

        match outcome {
            Ok(result) => {
                if !result.success && ctx.config.log_errors {
                    logging::log_tool_failure(name, result.error.as_deref().unwrap_or(""));
                }
                result
            }
            Err(e) => {
                if ctx.config.log_errors {
                    logging::log_tool_failure(name, &e.to_string());
                }
                echo_context(QueryResult::failure(e.to_string()), arguments)
            }
        }
    }
}

impl ToolHandler {
    pub async fn invoke(self, args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
        match self {
            Self::AiChat => ai_chat(args, ctx).await,
            Self::ExecuteQuery => execute_query(args, ctx).await,
            Self::QueryTable => query_table(args, ctx).await,
            Self::ListTables => list_tables(args, ctx).await,
            Self::DescribeTable => describe_table(args, ctx).await,
            Self::GetTableData => get_table_data(args, ctx).await,
        }
    }
}

/// Typed accessors over the generic argument bag. `null` counts as absent.
#[derive(Clone, Copy)]
pub struct ToolArgs<'a> {
    args: &'a Map<String, Value>,
}

impl<'a> ToolArgs<'a> {
    pub fn new(args: &'a Map<String, Value>) -> Self {
        Self { args }
    }

    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.args.get(key).filter(|v| !v.is_null())
    }

    pub fn optional_str(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn required_str(&self, key: &'static str) -> Result<String, ToolError> {
        self.optional_str(key).ok_or(ToolError::MissingArgument(key))
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.value(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            },
            _ => default,
        }
    }

    pub fn object(&self, key: &'static str) -> Result<Map<String, Value>, ToolError> {
        match self.value(key) {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(ToolError::InvalidArgument(key, "expected an object")),
        }
    }

    pub fn count(&self, key: &str) -> Option<usize> {
        self.value(key).and_then(coerce_count)
    }
}

/// Run a governed query through the store and cap the returned rows.
pub(crate) async fn run_query(ctx: &ToolContext<'_>, query: &GovernedQuery) -> Result<Vec<Row>, StoreError> {
    if ctx.config.log_queries {
        logging::log_query(&query.sql, query.limit);
    }
    let mut rows = ctx.store.execute(&query.sql).await?;
    rows.truncate(query.limit);
    Ok(rows)
}

fn ensure_allowed(ctx: &ToolContext<'_>, table: &str) -> Result<(), ToolError> {
    if ctx.config.table_allowed(table) {
        Ok(())
    } else {
        logging::log_table_denied(table);
        Err(ToolError::TableNotAllowed(table.to_string()))
    }
}

fn to_values<T: Serialize>(items: &[T]) -> Result<Vec<Value>, ToolError> {
    Ok(items.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?)
}

/// Keep the caller's target on failures so the error is self-describing.
fn echo_context(mut result: QueryResult, arguments: &Map<String, Value>) -> QueryResult {
    for key in ["query", "table_name", "question"] {
        if let Some(value @ Value::String(_)) = arguments.get(key) {
            result.extra.insert(key.to_string(), value.clone());
        }
    }
    result
}

async fn execute_query(args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
    let sql = args.required_str("query")?;
    let requested = args.value("limit").cloned().unwrap_or_else(|| Value::from(ctx.config.max_query_rows));
    let limit = ctx.config.validate_query_limit(&requested);

    let query = GovernedQuery::raw(sql, limit);
    let rows = run_query(ctx, &query).await?;
    Ok(QueryResult::rows(rows)
        .with("query", query.sql)
        .with("limit", limit))
}

async fn query_table(args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
    let table = args.required_str("table_name")?;
    ensure_allowed(ctx, &table)?;

    let filters = args.object("filters")?;
    let requested = args.value("limit").cloned().unwrap_or_else(|| Value::from(ctx.config.default_query_limit));
    let limit = ctx.config.validate_query_limit(&requested);
    let offset = args.count("offset").unwrap_or(0);
    let order_by = args.optional_str("order_by");

    let query = GovernedQuery::table_select(ctx.store, &table, &filters, order_by.as_deref(), limit, offset);
    let rows = run_query(ctx, &query).await?;
    Ok(QueryResult::rows(rows)
        .with("table_name", table)
        .with("filters", Value::Object(filters))
        .with("limit", limit)
        .with("offset", offset))
}

async fn list_tables(args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
    let include_system = args.flag("include_system_tables", false);
    let tables = ctx.store.list_catalog_tables(include_system).await?;
    let count = tables.len();
    Ok(QueryResult::values(to_values(&tables)?)
        .with("count", count)
        .with("include_system_tables", include_system))
}

async fn describe_table(args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
    let table = args.required_str("table_name")?;
    ensure_allowed(ctx, &table)?;

    let columns = ctx.store.describe_columns(&table).await?;
    let primary_keys = ctx.store.describe_primary_keys(&table).await?;
    let foreign_keys = ctx.store.describe_foreign_keys(&table).await?;
    let indexes = ctx.store.describe_indexes(&table).await?;

    let column_count = columns.len();
    Ok(QueryResult::values(to_values(&columns)?)
        .with("table_name", table)
        .with("primary_keys", primary_keys)
        .with("foreign_keys", to_values(&foreign_keys)?)
        .with("indexes", to_values(&indexes)?)
        .with("column_count", column_count))
}

async fn get_table_data(args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
    let table = args.required_str("table_name")?;
    ensure_allowed(ctx, &table)?;

    let requested = args.value("limit").cloned().unwrap_or_else(|| Value::from(ctx.config.default_page_size));
    let limit = ctx.config.validate_page_size(&requested);
    let offset = args.count("offset").unwrap_or(0);

    let query = GovernedQuery::table_page(ctx.store, &table, limit, offset);
    let rows = run_query(ctx, &query).await?;
    Ok(QueryResult::rows(rows)
        .with("table_name", table)
        .with("limit", limit)
        .with("offset", offset))
}

async fn ai_chat(args: ToolArgs<'_>, ctx: &ToolContext<'_>) -> Result<QueryResult, ToolError> {
    let question = args.required_str("question")?;
    let context = args.optional_str("context").unwrap_or_default();
    Ok(chat::answer(ctx, &question, &context).await)
}

fn ai_chat_definition() -> ToolDefinition {
    ToolDefinition {
        name: "ai_chat".to_string(),
        description: "Natural language database assistant. Ask questions in plain English and get answers from your database.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Your question about the database in natural language (e.g., 'How many accounts?', 'Show me recent orders')"
                },
                "context": {
                    "type": "string",
                    "description": "Optional context or follow-up information",
                    "default": ""
                }
            },
            "required": ["question"]
        }),
    }
}

fn execute_query_definition(config: &Configuration) -> ToolDefinition {
    ToolDefinition {
        name: "execute_query".to_string(),
        description: "Execute raw SQL queries against the database (read/write operations)".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "SQL query to execute"
                },
                "limit": {
                    "type": "integer",
                    "description": format!("Maximum number of rows to return (default: {})", config.max_query_rows),
                    "default": config.max_query_rows
                }
            },
            "required": ["query"]
        }),
    }
}

fn query_table_definition(config: &Configuration) -> ToolDefinition {
    ToolDefinition {
        name: "query_table".to_string(),
        description: "Query a specific table with optional filters and pagination".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Name of the table to query"
                },
                "filters": {
                    "type": "object",
                    "description": "Key-value pairs for WHERE clause equality filters",
                    "default": {}
                },
                "limit": {
                    "type": "integer",
                    "description": format!("Maximum number of rows to return (default: {})", config.default_query_limit),
                    "default": config.default_query_limit
                },
                "offset": {
                    "type": "integer",
                    "description": "Number of rows to skip (default: 0)",
                    "default": 0
                },
                "order_by": {
                    "type": "string",
                    "description": "Column name to order by, optionally followed by ASC or DESC"
                }
            },
            "required": ["table_name"]
        }),
    }
}

fn list_tables_definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_tables".to_string(),
        description: "List all tables in the database with basic information".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "include_system_tables": {
                    "type": "boolean",
                    "description": "Include system tables (default: false)",
                    "default": false
                }
            }
        }),
    }
}

fn describe_table_definition() -> ToolDefinition {
    ToolDefinition {
        name: "describe_table".to_string(),
        description: "Get detailed schema information for a specific table".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Name of the table to describe"
                }
            },
            "required": ["table_name"]
        }),
    }
}

fn get_table_data_definition(config: &Configuration) -> ToolDefinition {
    ToolDefinition {
        name: "get_table_data".to_string(),
        description: "Retrieve paginated data from a specific table".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Name of the table to query"
                },
                "limit": {
                    "type": "integer",
                    "description": format!("Maximum number of rows to return (default: {})", config.default_page_size),
                    "default": config.default_page_size
                },
                "offset": {
                    "type": "integer",
                    "description": "Number of rows to skip (default: 0)",
                    "default": 0
                }
            },
            "required": ["table_name"]
        }),
    }
}
