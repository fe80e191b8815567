//! MCP Tools Tests
//!
//! Each tool called through `tools/call` against the seeded database.

use {
    super::{call_tool, dispatcher_with, fixture_dispatcher},
    crate::{
        config::{Configuration, Settings},
        dispatcher::Dispatcher,
        store::SqliteStore,
    },
    serde_json::{json, Value},
    std::sync::Arc,
};

fn row_ids(result: &Value, key: &str) -> Vec<Value> {
    result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row[key].clone())
        .collect()
}

#[tokio::test]
async fn test_execute_query() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(
        &dispatcher,
        "execute_query",
        json!({"query": "SELECT member_id, name FROM account ORDER BY member_id"}),
    )
    .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["row_count"], 3);
    assert_eq!(result["limit"], 1000);
    assert_eq!(result["query"], "SELECT member_id, name FROM account ORDER BY member_id");
    assert_eq!(result["data"][1]["name"], "O'Brien Ltd");
}

#[tokio::test]
async fn test_execute_query_truncates_to_limit() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(
        &dispatcher,
        "execute_query",
        json!({"query": "SELECT * FROM account ORDER BY member_id", "limit": 2}),
    )
    .await;
    assert_eq!(result["row_count"], 2);
    assert_eq!(row_ids(&result, "member_id"), vec![json!("M1"), json!("M2")]);

    let result = call_tool(
        &dispatcher,
        "execute_query",
        json!({"query": "SELECT 1 AS one", "limit": 5000}),
    )
    .await;
    assert_eq!(result["limit"], 1000);

    let result = call_tool(
        &dispatcher,
        "execute_query",
        json!({"query": "SELECT * FROM account", "limit": "2 rows"}),
    )
    .await;
    assert_eq!(result["row_count"], 2);
}

#[tokio::test]
async fn test_execute_query_passes_writes_through() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(
        &dispatcher,
        "execute_query",
        json!({"query": "INSERT INTO billing_note (note) VALUES ('hello')"}),
    )
    .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["row_count"], 0);

    let result = call_tool(
        &dispatcher,
        "execute_query",
        json!({"query": "SELECT note FROM billing_note"}),
    )
    .await;
    assert_eq!(result["data"][0]["note"], "hello");
}

#[tokio::test]
async fn test_execute_query_failures() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "execute_query", json!({})).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "Missing required argument: query");

    let result = call_tool(&dispatcher, "execute_query", json!({"query": "SELECT * FROM nowhere"})).await;
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("no such table"));
    assert_eq!(result["query"], "SELECT * FROM nowhere");
    assert!(result.get("data").is_none());
}

#[tokio::test]
async fn test_query_table_filters() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "account", "filters": {"city": "Bangkok"}}),
    )
    .await;
    assert_eq!(result["success"], true);
    assert_eq!(row_ids(&result, "member_id"), vec![json!("M1")]);
    assert_eq!(result["filters"], json!({"city": "Bangkok"}));
    assert_eq!(result["limit"], 100);
    assert_eq!(result["offset"], 0);

    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "account", "filters": {"name": "O'Brien Ltd"}}),
    )
    .await;
    assert_eq!(row_ids(&result, "member_id"), vec![json!("M2")]);

    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "account", "filters": {"city": null}}),
    )
    .await;
    assert_eq!(row_ids(&result, "member_id"), vec![json!("M3")]);
}

#[tokio::test]
async fn test_query_table_order_and_pagination() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "order", "order_by": "total DESC", "limit": 2, "offset": 1}),
    )
    .await;
    assert_eq!(result["success"], true);
    assert_eq!(row_ids(&result, "id"), vec![json!(1), json!(3)]);
    assert_eq!(result["table_name"], "order");
}

#[tokio::test]
async fn test_query_table_escapes_hostile_input() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "account", "filters": {"name": "x' OR '1'='1"}}),
    )
    .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["row_count"], 0);

    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "account\"; DROP TABLE account; --"}),
    )
    .await;
    assert_eq!(result["success"], false);

    let result = call_tool(&dispatcher, "execute_query", json!({"query": "SELECT COUNT(*) AS n FROM account"})).await;
    assert_eq!(result["data"][0]["n"], 3);
}

#[tokio::test]
async fn test_query_table_governance() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "query_table", json!({"table_name": "secret_keys"})).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "Access to table 'secret_keys' is not allowed");
    assert_eq!(result["table_name"], "secret_keys");

    let result = call_tool(&dispatcher, "query_table", json!({"table_name": "_prisma_migrations"})).await;
    assert_eq!(result["error"], "Access to table '_prisma_migrations' is not allowed");

    let result = call_tool(
        &dispatcher,
        "query_table",
        json!({"table_name": "account", "filters": ["city"]}),
    )
    .await;
    assert_eq!(result["error"], "Invalid argument 'filters': expected an object");
}

#[tokio::test]
async fn test_allow_list_restricts_tools() {
    let config = Configuration::from_settings(Settings {
        allowed_tables: vec!["account".to_string()],
        ..Settings::default()
    })
    .unwrap();
    let dispatcher = dispatcher_with(config).await;

    let result = call_tool(&dispatcher, "get_table_data", json!({"table_name": "account"})).await;
    assert_eq!(result["success"], true);

    for tool in ["query_table", "describe_table", "get_table_data"] {
        let result = call_tool(&dispatcher, tool, json!({"table_name": "invoice"})).await;
        assert_eq!(result["error"], "Access to table 'invoice' is not allowed", "tool {tool}");
    }
}

#[tokio::test]
async fn test_list_tables() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "list_tables", json!({})).await;
    assert_eq!(result["success"], true);
    let names: Vec<&str> = result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table_name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["account", "billing_note", "invoice", "order", "payment_receipt", "secret_keys"]
    );
    assert_eq!(result["count"], 6);
    assert_eq!(result["data"][0]["table_type"], "BASE TABLE");

    let result = call_tool(&dispatcher, "list_tables", json!({"include_system_tables": true})).await;
    assert_eq!(result["include_system_tables"], true);
    assert!(result["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["table_name"] == "_prisma_migrations"));
}

#[tokio::test]
async fn test_describe_table() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "describe_table", json!({"table_name": "account"})).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["table_name"], "account");
    assert_eq!(result["column_count"], 4);
    assert_eq!(result["row_count"], 4);
    assert_eq!(result["primary_keys"], json!(["member_id"]));
    assert_eq!(result["data"][0]["column_name"], "member_id");
    assert_eq!(result["data"][0]["data_type"], "VARCHAR");
    assert_eq!(result["data"][1]["is_nullable"], false);

    let result = call_tool(&dispatcher, "describe_table", json!({"table_name": "invoice"})).await;
    let fk = &result["foreign_keys"][0];
    assert_eq!(fk["column"], "member_id");
    assert_eq!(fk["references_table"], "account");
    assert_eq!(fk["references_column"], "member_id");
    assert_eq!(fk["delete_rule"], "CASCADE");
    let indexes = result["indexes"].as_array().unwrap();
    assert!(indexes
        .iter()
        .any(|i| i["index_name"] == "idx_invoice_date" && i["is_unique"] == false));
}

#[tokio::test]
async fn test_describe_missing_table() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(&dispatcher, "describe_table", json!({"table_name": "ghost"})).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "Table not found: ghost");

    let result = call_tool(&dispatcher, "describe_table", json!({})).await;
    assert_eq!(result["error"], "Missing required argument: table_name");
}

#[tokio::test]
async fn test_get_table_data() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "get_table_data", json!({"table_name": "order"})).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["row_count"], 3);
    assert_eq!(result["limit"], 50);
    assert_eq!(result["offset"], 0);

    let result = call_tool(
        &dispatcher,
        "get_table_data",
        json!({"table_name": "order", "limit": 9999, "offset": 2}),
    )
    .await;
    assert_eq!(result["limit"], 500);
    assert_eq!(result["offset"], 2);
    assert_eq!(result["row_count"], 1);
}

#[tokio::test]
async fn test_ai_chat_count() {
    let dispatcher = fixture_dispatcher().await;
    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "How many accounts?"})).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["answer"], "There are 3 records in the database.");
    assert_eq!(result["query_type"], "count");
    assert_eq!(result["sql_query"], "SELECT COUNT(*) AS count FROM account");
    assert_eq!(result["question"], "How many accounts?");

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "how many billing notes"})).await;
    assert_eq!(result["answer"], "There are 0 records in the database.");
}

#[tokio::test]
async fn test_ai_chat_lists() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "Show me recent orders"})).await;
    assert_eq!(result["query_type"], "list");
    assert_eq!(result["answer"], "I found 3 records. Here are the details:");
    assert_eq!(result["data"][0]["order_date"], "2024-03-01");

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "show payments"})).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["answer"], "No records found.");

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "What tables are available?"})).await;
    assert_eq!(result["row_count"], 6);
    assert!(!result["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["table_name"] == "_prisma_migrations"));

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "customers in Bangkok"})).await;
    assert_eq!(result["sql_query"], "SELECT * FROM \"account\" LIMIT 10");
    assert_eq!(result["row_count"], 3);

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "accountants in bangkok"})).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["sql_query"], "SELECT * FROM \"account\" LIMIT 10");
}

#[tokio::test]
async fn test_ai_chat_unmatched_and_missing() {
    let dispatcher = fixture_dispatcher().await;

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "what is the weather like"})).await;
    assert_eq!(result["success"], false);
    assert_eq!(
        result["suggestion"],
        "Try questions like 'How many accounts?', 'Show me recent orders', or 'List all tables'"
    );

    let result = call_tool(&dispatcher, "ai_chat", json!({"context": "follow-up"})).await;
    assert_eq!(result["error"], "Missing required argument: question");
}

#[tokio::test]
async fn test_ai_chat_execution_failure() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dispatcher = Dispatcher::new(Configuration::default(), Arc::new(store));

    let result = call_tool(&dispatcher, "ai_chat", json!({"question": "How many accounts?"})).await;
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("no such table"));
    assert_eq!(result["question"], "How many accounts?");
    assert!(result["suggestion"].as_str().unwrap().starts_with("Try rephrasing"));
}

#[tokio::test]
async fn test_logging_switches_do_not_change_results() {
    let config = Configuration::from_settings(Settings {
        log_queries: false,
        log_errors: false,
        ..Settings::default()
    })
    .unwrap();
    let dispatcher = dispatcher_with(config).await;

    let result = call_tool(&dispatcher, "execute_query", json!({"query": "SELECT 1 AS one"})).await;
    assert_eq!(result["data"][0]["one"], 1);

    let result = call_tool(&dispatcher, "execute_query", json!({"query": "nonsense"})).await;
    assert_eq!(result["success"], false);
}
