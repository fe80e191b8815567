//! Governed query construction
//!
//! A [`GovernedQuery`] is the SQL a tool is about to run together with the
//! row window it was clamped to. It lives for a single call.

use {
    crate::store::DataStore,
    serde_json::{Map, Value},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernedQuery {
    pub sql: String,
    pub limit: usize,
}

impl GovernedQuery {
    /// Caller-supplied SQL, passed through verbatim. The limit is applied to
    /// the returned rows rather than written into the statement.
    pub fn raw(sql: impl Into<String>, limit: usize) -> Self {
        Self {
            sql: sql.into(),
            limit,
        }
    }

    /// `SELECT * FROM <table> [WHERE ...] [ORDER BY ...] LIMIT l OFFSET o`
    /// with every identifier and value escaped by the store.
    pub fn table_select(
        store: &dyn DataStore,
        table: &str,
        filters: &Map<String, Value>,
        order_by: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Self {
        let mut sql = format!("SELECT * FROM {}", store.quote_identifier(table));

        if !filters.is_empty() {
            let conditions: Vec<String> = filters
                .iter()
                .map(|(column, value)| {
                    let column = store.quote_identifier(column);
                    match value {
                        Value::Null => format!("{column} IS NULL"),
                        _ => format!("{column} = {}", store.quote_literal(value)),
                    }
                })
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(order) = order_by.map(str::trim).filter(|o| !o.is_empty()) {
            let (column, direction) = split_direction(order);
            sql.push_str(" ORDER BY ");
            sql.push_str(&store.quote_identifier(column));
            if let Some(direction) = direction {
                sql.push(' ');
                sql.push_str(direction);
            }
        }

        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

        Self { sql, limit }
    }

    /// Paginated dump of a whole table.
    pub fn table_page(store: &dyn DataStore, table: &str, limit: usize, offset: usize) -> Self {
        Self::table_select(store, table, &Map::new(), None, limit, offset)
    }
}

/// Peel a trailing `ASC`/`DESC` off an order-by column.
fn split_direction(order: &str) -> (&str, Option<&'static str>) {
    if let Some((column, dir)) = order.rsplit_once(char::is_whitespace) {
        match dir.to_ascii_uppercase().as_str() {
            "ASC" => return (column.trim_end(), Some("ASC")),
            "DESC" => return (column.trim_end(), Some("DESC")),
            _ => {}
        }
    }
    (order, None)
}
