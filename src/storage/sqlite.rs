//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the
//! [`WebsiteSource`] and [`EmailStore`] traits over configurable tables.

use crate::config::{InputConfig, OutputConfig};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{EmailStore, StorageResult, WebsiteRecord, WebsiteSource};
use crate::HarvestError;
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    select_sql: String,
    update_sql: String,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `input` - Table and columns websites are read from
    /// * `output` - Table and columns e-mails are written to
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path, input: &InputConfig, output: &OutputConfig) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn, input, output)
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory(input: &InputConfig, output: &OutputConfig) -> Result<Self, HarvestError> {
        Self::with_connection(Connection::open_in_memory()?, input, output)
    }

    fn with_connection(
        conn: Connection,
        input: &InputConfig,
        output: &OutputConfig,
    ) -> Result<Self, HarvestError> {
        initialize_schema(&conn, input, output)?;

        let select_sql = format!(
            "SELECT {id}, {url} FROM {table} ORDER BY {id} LIMIT ?1 OFFSET ?2",
            id = input.id_field,
            url = input.url_field,
            table = input.table
        );
        let update_sql = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2",
            output.table, output.emails_field, output.id_field
        );

        Ok(Self {
            conn,
            select_sql,
            update_sql,
        })
    }

    /// Direct access to the connection, used to seed data
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl WebsiteSource for SqliteStorage {
    fn fetch_batch(&self, offset: u64, limit: u32) -> StorageResult<Vec<WebsiteRecord>> {
        let mut stmt = self.conn.prepare_cached(&self.select_sql)?;

        let rows = stmt
            .query_map(params![limit, offset as i64], |row| {
                Ok(WebsiteRecord {
                    id: value_to_id(row.get::<_, Value>(0)?),
                    url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Read {} websites at offset {}", rows.len(), offset);
        Ok(rows)
    }
}

impl EmailStore for SqliteStorage {
    fn update_emails(&mut self, id: &str, emails: &str) -> StorageResult<usize> {
        let updated = self.conn.execute(&self.update_sql, params![emails, id])?;
        Ok(updated)
    }
}

/// Renders an id column of any SQLite type as text
fn value_to_id(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}
