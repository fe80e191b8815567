//! SQLite implementation of the Data Store adapter

use {
    super::{is_system_table, CatalogTable, ColumnInfo, DataStore, ForeignKey, IndexInfo, Row},
    crate::error::StoreError,
    async_trait::async_trait,
    rusqlite::{params, types::ValueRef, Connection, OptionalExtension},
    serde_json::{json, Value},
    std::{path::Path, time::Duration},
    tokio::sync::Mutex,
    tracing::debug,
};

/// A single SQLite connection shared by every request.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opened SQLite database");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// How long a statement waits for a locked database before failing.
    pub async fn set_busy_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        self.conn.lock().await.busy_timeout(timeout)?;
        Ok(())
    }

    /// Run several statements at once, e.g. to load a schema.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().await.execute_batch(sql)?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn.lock().await;
        query_rows(&conn, sql)
    }

    async fn list_catalog_tables(&self, include_system: bool) -> Result<Vec<CatalogTable>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT name, type FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                Ok(CatalogTable {
                    table_name: row.get(0)?,
                    table_type: if kind == "view" { "VIEW" } else { "BASE TABLE" }.to_string(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tables
            .into_iter()
            .filter(|t| include_system || !is_system_table(&t.table_name))
            .collect())
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, table)?;

        let mut stmt = conn.prepare("SELECT * FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| {
                let cid: i64 = row.get(0)?;
                let declared: String = row.get(2)?;
                let not_null: i64 = row.get(3)?;
                let (data_type, first, second) = parse_declared_type(&declared);
                let is_text = is_character_type(&data_type);
                Ok(ColumnInfo {
                    column_name: row.get(1)?,
                    is_nullable: not_null == 0,
                    column_default: row.get(4)?,
                    character_maximum_length: if is_text { first } else { None },
                    numeric_precision: if is_text { None } else { first },
                    numeric_scale: if is_text { None } else { second },
                    ordinal_position: (cid + 1) as u32,
                    data_type,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    async fn describe_primary_keys(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, table)?;
        primary_keys(&conn, table)
    }

    async fn describe_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, StoreError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, table)?;

        let mut stmt = conn.prepare("SELECT * FROM pragma_foreign_key_list(?1) ORDER BY id, seq")?;
        let raw = stmt
            .query_map(params![table], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut keys = Vec::with_capacity(raw.len());
        for (id, references_table, column, to, on_update, on_delete) in raw {
            // A missing target column means the referenced table's primary key
            let references_column = match to {
                Some(col) => Some(col),
                None => primary_keys(&conn, &references_table)?.into_iter().next(),
            };
            keys.push(ForeignKey {
                constraint_name: format!("fk_{table}_{id}"),
                column,
                references_table,
                references_column,
                update_rule: on_update,
                delete_rule: on_delete,
            });
        }
        Ok(keys)
    }

    async fn describe_indexes(&self, table: &str) -> Result<Vec<IndexInfo>, StoreError> {
        let conn = self.conn.lock().await;
        ensure_table(&conn, table)?;

        let mut stmt = conn.prepare("SELECT name, \"unique\", origin FROM pragma_index_list(?1) ORDER BY name")?;
        let listed = stmt
            .query_map(params![table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut indexes = Vec::with_capacity(listed.len());
        for (name, unique, origin) in listed {
            let definition: Option<String> = conn
                .query_row(
                    "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    params![name],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            let mut cols = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
            let columns = cols
                .query_map(params![name], |row| row.get::<_, Option<String>>(0))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|c| c.unwrap_or_else(|| "<expression>".to_string()))
                .collect();

            indexes.push(IndexInfo {
                index_name: name,
                definition,
                columns,
                is_unique: unique != 0,
                is_primary: origin == "pk",
            });
        }
        Ok(indexes)
    }

    async fn current_database_name(&self) -> Result<String, StoreError> {
        let conn = self.conn.lock().await;
        let file: Option<String> = conn
            .query_row(
                "SELECT file FROM pragma_database_list WHERE name = 'main'",
                [],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        Ok(file
            .filter(|f| !f.is_empty())
            .and_then(|f| {
                Path::new(&f)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "main".to_string()))
    }

    fn catalog_query(&self) -> String {
        "SELECT name AS table_name FROM sqlite_master WHERE type = 'table' \
         AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         AND name NOT LIKE '\\_prisma\\_%' ESCAPE '\\' ORDER BY name"
            .to_string()
    }
}

fn query_rows(conn: &Connection, sql: &str) -> Result<Vec<Row>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() == 0 {
        let changed = stmt.execute([])?;
        debug!(changed, "Statement returned no columns");
        return Ok(Vec::new());
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        out.push(record);
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

fn ensure_table(conn: &Connection, table: &str) -> Result<(), StoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::TableNotFound(table.to_string())),
    }
}

fn primary_keys(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")?;
    let keys = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

/// Split a declared type like `VARCHAR(255)` or `DECIMAL(10, 2)` into its
/// base name and up to two size parameters.
fn parse_declared_type(declared: &str) -> (String, Option<u32>, Option<u32>) {
    let declared = declared.trim();
    let Some(open) = declared.find('(') else {
        return (declared.to_string(), None, None);
    };
    let base = declared[..open].trim().to_string();
    let inner = declared[open + 1..].trim_end_matches(')');
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u32>().ok());
    let first = parts.next().flatten();
    let second = parts.next().flatten();
    (base, first, second)
}

fn is_character_type(base: &str) -> bool {
    let upper = base.to_ascii_uppercase();
    ["CHAR", "TEXT", "CLOB"].iter().any(|t| upper.contains(t))
}
