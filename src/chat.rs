//! Natural-language query tool
//!
//! Maps a free-text question onto one of a fixed set of canned queries. Rules
//! are tried in order and the first match wins; free text is never executed.

use {
    crate::{
        query::GovernedQuery,
        store::DataStore,
        tools::{run_query, ToolContext},
        types::QueryResult,
    },
    once_cell::sync::Lazy,
    regex::Regex,
    serde::Serialize,
    serde_json::Value,
    tracing::{debug, info},
};

pub const UNMATCHED_ERROR: &str = "I couldn't understand your question. Please try asking about \
     accounts, orders, invoices, payments, or billing notes.";
pub const UNMATCHED_SUGGESTION: &str =
    "Try questions like 'How many accounts?', 'Show me recent orders', or 'List all tables'";
pub const FAILED_SUGGESTION: &str =
    "Try rephrasing your question or ask about specific tables like 'account', 'order', 'invoice', etc.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Count,
    List,
    Unknown,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::List => "list",
            Self::Unknown => "unknown",
        }
    }
}

/// Outcome of classifying a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIntent {
    pub matched: bool,
    pub query: String,
    pub kind: IntentKind,
    pub error: Option<String>,
}

impl ParsedIntent {
    fn matched(query: String, kind: IntentKind) -> Self {
        Self {
            matched: true,
            query,
            kind,
            error: None,
        }
    }

    fn unmatched() -> Self {
        Self {
            matched: false,
            query: String::new(),
            kind: IntentKind::Unknown,
            error: Some(UNMATCHED_ERROR.to_string()),
        }
    }
}

enum CannedQuery {
    Sql(&'static str),
    /// Whatever the store uses to list its user tables
    Catalog,
}

struct IntentRule {
    pattern: Regex,
    kind: IntentKind,
    query: CannedQuery,
}

impl IntentRule {
    fn new(pattern: &str, kind: IntentKind, query: CannedQuery) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("intent patterns are valid regexes"),
            kind,
            query,
        }
    }
}

// Order matters: the first matching rule wins.
static RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    use {CannedQuery::*, IntentKind::*};
    vec![
        IntentRule::new(
            r"how many.*account|count.*account|total.*account|number.*account",
            Count,
            Sql("SELECT COUNT(*) AS count FROM account"),
        ),
        IntentRule::new(
            r"show.*account|list.*account|get.*account|find.*account",
            List,
            Sql("SELECT * FROM account LIMIT 10"),
        ),
        IntentRule::new(
            r"how many.*order|count.*order|total.*order|number.*order",
            Count,
            Sql(r#"SELECT COUNT(*) AS count FROM "order""#),
        ),
        IntentRule::new(
            r"show.*order|list.*order|get.*order|find.*order|recent.*order",
            List,
            Sql(r#"SELECT * FROM "order" ORDER BY order_date DESC LIMIT 10"#),
        ),
        IntentRule::new(
            r"how many.*invoice|count.*invoice|total.*invoice|number.*invoice",
            Count,
            Sql("SELECT COUNT(*) AS count FROM invoice"),
        ),
        IntentRule::new(
            r"show.*invoice|list.*invoice|get.*invoice|find.*invoice|recent.*invoice",
            List,
            Sql("SELECT * FROM invoice ORDER BY invoice_date DESC LIMIT 10"),
        ),
        IntentRule::new(
            r"how many.*payment|count.*payment|total.*payment|number.*payment",
            Count,
            Sql("SELECT COUNT(*) AS count FROM payment_receipt"),
        ),
        IntentRule::new(
            r"show.*payment|list.*payment|get.*payment|find.*payment|recent.*payment",
            List,
            Sql("SELECT * FROM payment_receipt ORDER BY created_date DESC LIMIT 10"),
        ),
        IntentRule::new(
            r"how many.*billing|count.*billing|total.*billing|number.*billing",
            Count,
            Sql("SELECT COUNT(*) AS count FROM billing_note"),
        ),
        IntentRule::new(
            r"what.*table|list.*table|show.*table|available.*table",
            List,
            Catalog,
        ),
    ]
});

/// Words that name a table when no rule matched, checked in this order.
const TABLE_SYNONYMS: &[(&str, &str)] = &[
    ("account", "account"),
    ("accounts", "account"),
    ("order", "order"),
    ("orders", "order"),
    ("invoice", "invoice"),
    ("invoices", "invoice"),
    ("payment", "payment_receipt"),
    ("payments", "payment_receipt"),
    ("billing", "billing_note"),
    ("billing_note", "billing_note"),
    ("billing_notes", "billing_note"),
    ("credit", "account_credit"),
    ("credits", "account_credit"),
    ("customer", "account"),
    ("customers", "account"),
];

/// Classify a question into a canned query.
pub fn parse_question(question: &str, store: &dyn DataStore) -> ParsedIntent {
    let normalized = question.trim().to_lowercase();

    if let Some(rule) = RULES.iter().find(|rule| rule.pattern.is_match(&normalized)) {
        let sql = match rule.query {
            CannedQuery::Sql(sql) => sql.to_string(),
            CannedQuery::Catalog => store.catalog_query(),
        };
        return ParsedIntent::matched(sql, rule.kind);
    }

    match extract_table_name(&normalized) {
        Some(table) => ParsedIntent::matched(
            format!("SELECT * FROM {} LIMIT 10", store.quote_identifier(table)),
            IntentKind::List,
        ),
        None => ParsedIntent::unmatched(),
    }
}

/// First synonym, in table order, found anywhere in the question.
fn extract_table_name(question: &str) -> Option<&'static str> {
    TABLE_SYNONYMS
        .iter()
        .find(|(synonym, _)| question.contains(synonym))
        .map(|(_, table)| *table)
}

/// Turn result rows into a one-sentence answer.
pub fn render_answer(kind: IntentKind, rows: &[Value]) -> String {
    match kind {
        IntentKind::Count => {
            let count = rows
                .first()
                .and_then(|row| row.get("count").or_else(|| row.get("account_count")))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| rows.len().to_string());
            format!("There are {count} records in the database.")
        }
        IntentKind::List if rows.is_empty() => "No records found.".to_string(),
        IntentKind::List => format!("I found {} records. Here are the details:", rows.len()),
        IntentKind::Unknown if rows.is_empty() => "No results found for your question.".to_string(),
        IntentKind::Unknown => "Here's what I found:".to_string(),
    }
}

/// Answer a question by running the matching canned query.
pub async fn answer(ctx: &ToolContext<'_>, question: &str, context: &str) -> QueryResult {
    info!(question = %question, event = "ai_chat", "Processing question");
    if !context.is_empty() {
        debug!(context = %context, "Question context supplied");
    }

    let intent = parse_question(question, ctx.store);
    if !intent.matched {
        return QueryResult::failure(intent.error.unwrap_or_else(|| UNMATCHED_ERROR.to_string()))
            .with("question", question)
            .with("suggestion", UNMATCHED_SUGGESTION);
    }

    let limit = ctx.config.validate_query_limit(&Value::from(ctx.config.max_query_rows));
    let query = GovernedQuery::raw(intent.query.clone(), limit);
    match run_query(ctx, &query).await {
        Ok(rows) => {
            let result = QueryResult::rows(rows);
            let answer = render_answer(intent.kind, result.rows_slice());
            result
                .with("question", question)
                .with("answer", answer)
                .with("query_type", intent.kind.as_str())
                .with("sql_query", intent.query)
        }
        Err(e) => QueryResult::failure(e.to_string())
            .with("question", question)
            .with("suggestion", FAILED_SUGGESTION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_account_count_rule() {
        let intent = parse_question("How many accounts?", &store());
        assert!(intent.matched);
        assert_eq!(intent.kind, IntentKind::Count);
        assert_eq!(intent.query, "SELECT COUNT(*) AS count FROM account");
    }

    #[test]
    fn test_rule_order_account_before_order() {
        // Mentions both; the account rule is checked first
        let intent = parse_question("count orders per account", &store());
        assert_eq!(intent.query, "SELECT COUNT(*) AS count FROM account");
    }

    #[test]
    fn test_recent_orders() {
        let intent = parse_question("Show me recent orders", &store());
        assert_eq!(intent.kind, IntentKind::List);
        assert!(intent.query.contains("ORDER BY order_date DESC"));
    }

    #[test]
    fn test_table_listing_uses_store_catalog() {
        let store = store();
        let intent = parse_question("What tables are available?", &store);
        assert_eq!(intent.query, store.catalog_query());
    }

    #[test]
    fn test_synonym_fallback() {
        let intent = parse_question("customers in bangkok", &store());
        assert!(intent.matched);
        assert_eq!(intent.query, "SELECT * FROM \"account\" LIMIT 10");

        let intent = parse_question("credits please", &store());
        assert_eq!(intent.query, "SELECT * FROM \"account_credit\" LIMIT 10");
    }

    #[test]
    fn test_synonyms_match_inside_words() {
        let intent = parse_question("accountants in bangkok", &store());
        assert!(intent.matched);
        assert_eq!(intent.kind, IntentKind::List);
        assert_eq!(intent.query, "SELECT * FROM \"account\" LIMIT 10");

        let intent = parse_question("recorder settings", &store());
        assert_eq!(intent.query, "SELECT * FROM \"order\" LIMIT 10");
    }

    #[test]
    fn test_unmatched() {
        let intent = parse_question("what is the weather", &store());
        assert!(!intent.matched);
        assert_eq!(intent.kind, IntentKind::Unknown);
        assert!(intent.error.is_some());
    }

    #[test]
    fn test_render_answer() {
        assert_eq!(
            render_answer(IntentKind::Count, &[json!({"count": 7})]),
            "There are 7 records in the database."
        );
        assert_eq!(
            render_answer(IntentKind::Count, &[json!({"account_count": "3"})]),
            "There are 3 records in the database."
        );
        assert_eq!(render_answer(IntentKind::List, &[]), "No records found.");
        assert_eq!(
            render_answer(IntentKind::List, &[json!({}), json!({})]),
            "I found 2 records. Here are the details:"
        );
        assert_eq!(render_answer(IntentKind::Unknown, &[json!({})]), "Here's what I found:");
    }
}
