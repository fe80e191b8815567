//! MCP Server Tests
//!
//! Dispatcher-level tests for the gateway, run against an in-memory SQLite
//! database seeded with a small billing schema.

pub mod tools_tests;

use {
    crate::{
        config::{Configuration, Settings},
        dispatcher::Dispatcher,
        store::SqliteStore,
    },
    serde_json::{json, Value},
    std::sync::Arc,
};

pub(crate) const FIXTURE_SCHEMA: &str = r#"
    CREATE TABLE account (
        member_id VARCHAR(10) PRIMARY KEY,
        name TEXT NOT NULL,
        city TEXT,
        credit DECIMAL(12, 2) DEFAULT 0
    );
    CREATE TABLE "order" (
        id INTEGER PRIMARY KEY,
        member_id VARCHAR(10) REFERENCES account(member_id),
        order_date TEXT NOT NULL,
        total REAL
    );
    CREATE TABLE invoice (
        id INTEGER PRIMARY KEY,
        member_id VARCHAR(10) REFERENCES account(member_id) ON DELETE CASCADE,
        invoice_date TEXT,
        amount REAL
    );
    CREATE INDEX idx_invoice_date ON invoice(invoice_date);
    CREATE TABLE payment_receipt (id INTEGER PRIMARY KEY, created_date TEXT, amount REAL);
    CREATE TABLE billing_note (id INTEGER PRIMARY KEY, note TEXT);
    CREATE TABLE secret_keys (id INTEGER PRIMARY KEY, value TEXT);
    CREATE TABLE _prisma_migrations (id TEXT PRIMARY KEY);

    INSERT INTO account VALUES ('M1', 'Acme', 'Bangkok', 10.5);
    INSERT INTO account VALUES ('M2', 'O''Brien Ltd', 'Dublin', 0);
    INSERT INTO account VALUES ('M3', 'Zeta', NULL, 99);
    INSERT INTO "order" VALUES (1, 'M1', '2024-01-01', 100.0);
    INSERT INTO "order" VALUES (2, 'M1', '2024-03-01', 250.0);
    INSERT INTO "order" VALUES (3, 'M2', '2024-02-01', 75.0);
    INSERT INTO invoice VALUES (1, 'M1', '2024-01-05', 100.0);
    INSERT INTO secret_keys VALUES (1, 'hunter2');
"#;

pub(crate) async fn fixture_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.execute_batch(FIXTURE_SCHEMA).await.unwrap();
    store
}

pub(crate) fn fixture_config() -> Configuration {
    let mut settings = Settings::default();
    settings.blocked_tables.push("secret_%".to_string());
    Configuration::from_settings(settings).unwrap()
}

pub(crate) async fn dispatcher_with(config: Configuration) -> Dispatcher {
    Dispatcher::new(config, Arc::new(fixture_store().await))
}

pub(crate) async fn fixture_dispatcher() -> Dispatcher {
    dispatcher_with(fixture_config()).await
}

/// Send one request and return the full response envelope.
pub(crate) async fn request(dispatcher: &Dispatcher, message: Value) -> Value {
    let line = serde_json::to_vec(&message).unwrap();
    dispatcher
        .handle_line(&line)
        .await
        .expect("request should produce a response")
}

/// Call a tool and decode the `QueryResult` carried in its text content.
pub(crate) async fn call_tool(dispatcher: &Dispatcher, name: &str, arguments: Value) -> Value {
    let response = request(
        dispatcher,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }),
    )
    .await;
    assert!(response.get("error").is_none(), "unexpected protocol error: {response}");
    let content = &response["result"]["content"][0];
    assert_eq!(content["type"], "text");
    serde_json::from_str(content["text"].as_str().unwrap()).unwrap()
}

/// Read a resource and decode its JSON document.
pub(crate) async fn read_resource(dispatcher: &Dispatcher, uri: &str) -> Value {
    let response = request(
        dispatcher,
        json!({"jsonrpc": "2.0", "id": "r", "method": "resources/read", "params": {"uri": uri}}),
    )
    .await;
    let contents = &response["result"]["contents"][0];
    assert_eq!(contents["uri"], uri);
    assert_eq!(contents["mimeType"], "application/json");
    serde_json::from_str(contents["text"].as_str().unwrap()).unwrap()
}
