//! Test helpers for integration tests
//!
//! Builds a server over a seeded in-memory database and drives whole
//! sessions through the line transport.

#![allow(dead_code)]

use {
    dbmcp::{Configuration, McpServer, SqliteStore},
    serde_json::{json, Value},
    std::sync::Arc,
};

pub const SCHEMA: &str = r#"
    CREATE TABLE account (member_id TEXT PRIMARY KEY, name TEXT NOT NULL, city TEXT);
    CREATE TABLE "order" (
        id INTEGER PRIMARY KEY,
        member_id TEXT REFERENCES account(member_id),
        order_date TEXT NOT NULL
    );
    CREATE TABLE invoice (id INTEGER PRIMARY KEY, invoice_date TEXT, amount REAL);
    CREATE TABLE _prisma_migrations (id TEXT PRIMARY KEY);

    INSERT INTO account VALUES ('M1', 'Acme', 'Bangkok');
    INSERT INTO account VALUES ('M2', 'Borealis', 'Oslo');
    INSERT INTO "order" VALUES (1, 'M1', '2024-01-01');
    INSERT INTO "order" VALUES (2, 'M2', '2024-02-01');
"#;

pub async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("in-memory database");
    store.execute_batch(SCHEMA).await.expect("schema loads");
    store
}

pub async fn test_server(config: Configuration) -> McpServer {
    McpServer::new(config, Arc::new(seeded_store().await))
}

/// Feed `input` through the transport and return every response line.
pub async fn run_session(server: &McpServer, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    server
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("session runs to EOF");

    let text = String::from_utf8(output).expect("responses are UTF-8");
    assert!(text.is_empty() || text.ends_with('\n'), "every response ends with a newline");
    text.lines()
        .map(|line| serde_json::from_str(line).expect("each line is one JSON document"))
        .collect()
}

pub fn tool_call(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
    .to_string()
}

/// Decode the `QueryResult` text of a `tools/call` response.
pub fn tool_result(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("tools/call result carries text content");
    serde_json::from_str(text).expect("tool text is JSON")
}
