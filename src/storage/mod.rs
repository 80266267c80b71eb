//! Storage module for the website input and e-mail output tables
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Paged reads of root websites from the input table
//! - Writing each root's e-mails back to the output table
//!
//! Table and column names come from configuration and are validated as
//! plain SQL identifiers before any statement is built.

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, schema_sql};
pub use sqlite::SqliteStorage;
pub use traits::{EmailStore, StorageError, StorageResult, WebsiteRecord, WebsiteSource};

use crate::config::Config;
use crate::HarvestError;
use std::path::Path;

/// Opens the storage database named in the configuration
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(config: &Config) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(
        Path::new(&config.database.path),
        &config.input,
        &config.output,
    )
}
