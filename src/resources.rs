//! Read-only introspection documents
//!
//! Each resource is regenerated from the Data Store on every read. Failures
//! never surface as protocol errors; they are rendered into the document.

use {
    crate::{
        error::StoreError,
        logging,
        store::DataStore,
        types::{ResourceContents, ResourceDefinition},
    },
    chrono::{SecondsFormat, Utc},
    serde_json::{json, Map, Value},
    tracing::warn,
};

pub const SCHEMA_URI: &str = "database://schema";
pub const TABLES_URI: &str = "database://tables";
pub const RELATIONSHIPS_URI: &str = "database://relationships";
pub const MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Schema,
    Tables,
    Relationships,
}

pub struct ResourceRegistry {
    resources: Vec<(ResourceDefinition, ResourceKind)>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        let define = |uri: &str, name: &str, description: &str| ResourceDefinition {
            uri: uri.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: MIME_TYPE.to_string(),
        };
        Self {
            resources: vec![
                (
                    define(
                        SCHEMA_URI,
                        "Database Schema",
                        "Complete database schema with all tables, columns, and relationships",
                    ),
                    ResourceKind::Schema,
                ),
                (
                    define(
                        TABLES_URI,
                        "Database Tables",
                        "List of all tables in the database with basic information",
                    ),
                    ResourceKind::Tables,
                ),
                (
                    define(
                        RELATIONSHIPS_URI,
                        "Database Relationships",
                        "Foreign key relationships between tables",
                    ),
                    ResourceKind::Relationships,
                ),
            ],
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.iter().map(|(def, _)| def)
    }

    /// `resources/list` result
    pub fn list(&self) -> Value {
        json!({ "resources": self.definitions().collect::<Vec<_>>() })
    }

    /// Render the document behind `uri` as JSON text.
    pub async fn read(&self, uri: &str, store: &dyn DataStore) -> String {
        logging::log_resource_read(uri);
        let kind = self
            .resources
            .iter()
            .find(|(def, _)| def.uri == uri)
            .map(|(_, kind)| *kind);

        let document = match kind {
            Some(ResourceKind::Schema) => schema_document(store).await,
            Some(ResourceKind::Tables) => tables_document(store).await,
            Some(ResourceKind::Relationships) => relationships_document(store).await,
            None => return json!({ "error": format!("Unknown resource: {uri}") }).to_string(),
        };

        match document {
            Ok(doc) => doc.to_string(),
            Err(e) => {
                warn!(uri = %uri, error = %e, event = "resource_error", "Resource generation failed");
                json!({ "error": e.to_string() }).to_string()
            }
        }
    }

    /// `resources/read` result
    pub async fn read_contents(&self, uri: &str, store: &dyn DataStore) -> Value {
        let contents = ResourceContents {
            uri: uri.to_string(),
            mime_type: MIME_TYPE.to_string(),
            text: self.read(uri, store).await,
        };
        json!({ "contents": [contents] })
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn table_schema(store: &dyn DataStore, table: &str) -> Result<Value, StoreError> {
    let columns = store.describe_columns(table).await?;
    let primary_keys = store.describe_primary_keys(table).await?;
    let foreign_keys = store.describe_foreign_keys(table).await?;
    let indexes = store.describe_indexes(table).await?;
    Ok(json!({
        "table_name": table,
        "column_count": columns.len(),
        "columns": columns,
        "primary_keys": primary_keys,
        "foreign_keys": foreign_keys,
        "indexes": indexes,
    }))
}

/// Foreign keys of every user table that has any, keyed by table name.
async fn relationships(store: &dyn DataStore) -> Result<Map<String, Value>, StoreError> {
    let mut out = Map::new();
    for table in store.list_catalog_tables(false).await? {
        let keys = store.describe_foreign_keys(&table.table_name).await?;
        if !keys.is_empty() {
            out.insert(table.table_name, json!(keys));
        }
    }
    Ok(out)
}

async fn schema_document(store: &dyn DataStore) -> Result<Value, StoreError> {
    let database_name = store.current_database_name().await?;
    let mut tables = Map::new();
    for table in store.list_catalog_tables(false).await? {
        let entry = match table_schema(store, &table.table_name).await {
            Ok(schema) => schema,
            Err(e) => json!({ "error": e.to_string(), "table_name": &table.table_name }),
        };
        tables.insert(table.table_name, entry);
    }

    Ok(json!({
        "database_name": database_name,
        "tables": tables,
        "relationships": relationships(store).await?,
        "generated_at": generated_at(),
    }))
}

async fn tables_document(store: &dyn DataStore) -> Result<Value, StoreError> {
    let database_name = store.current_database_name().await?;
    let mut tables = Vec::new();
    for table in store.list_catalog_tables(false).await? {
        let column_count = store.describe_columns(&table.table_name).await?.len();
        tables.push(json!({
            "table_name": table.table_name,
            "table_type": table.table_type,
            "column_count": column_count,
        }));
    }

    Ok(json!({
        "database_name": database_name,
        "count": tables.len(),
        "tables": tables,
        "generated_at": generated_at(),
    }))
}

async fn relationships_document(store: &dyn DataStore) -> Result<Value, StoreError> {
    let database_name = store.current_database_name().await?;
    let relationships = relationships(store).await?;
    Ok(json!({
        "database_name": database_name,
        "count": relationships.len(),
        "relationships": relationships,
        "generated_at": generated_at(),
    }))
}
