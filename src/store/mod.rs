//! Data Store adapter boundary
//!
//! The gateway never touches storage directly. Every SQL statement and every
//! catalog lookup goes through [`DataStore`].

pub mod sqlite;

use {
    crate::error::StoreError,
    async_trait::async_trait,
    serde::Serialize,
    serde_json::{Map, Value},
};

pub use sqlite::SqliteStore;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Name prefixes of tables that belong to the database engine or to
/// migration tooling rather than to the application.
pub const SYSTEM_TABLE_PREFIXES: &[&str] = &["sqlite_", "pg_", "_prisma_"];

pub fn is_system_table(name: &str) -> bool {
    SYSTEM_TABLE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogTable {
    pub table_name: String,
    pub table_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub ordinal_position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: Option<String>,
    pub constraint_name: String,
    pub update_rule: String,
    pub delete_rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub index_name: String,
    pub definition: Option<String>,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Storage backend consumed by the tool and resource registries.
///
/// Implementations must be safe to share across requests; a driver that is
/// not safe for concurrent use serialises access internally.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Run a statement verbatim and return every row it produces.
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, StoreError>;

    /// Tables and views in the catalog, ordered by name.
    async fn list_catalog_tables(&self, include_system: bool) -> Result<Vec<CatalogTable>, StoreError>;

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError>;

    async fn describe_primary_keys(&self, table: &str) -> Result<Vec<String>, StoreError>;

    async fn describe_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, StoreError>;

    async fn describe_indexes(&self, table: &str) -> Result<Vec<IndexInfo>, StoreError>;

    async fn current_database_name(&self) -> Result<String, StoreError>;

    /// SQL listing the user tables as rows with a `table_name` column.
    fn catalog_query(&self) -> String;

    /// Quote an identifier so it can be interpolated into SQL.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Render a JSON value as a SQL literal.
    fn quote_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_string(s),
            other => quote_string(&other.to_string()),
        }
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
