//! Storage traits and error types
//!
//! This module defines the trait interface the batch driver uses to read
//! websites and write back their e-mails, and the associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A website row read from the input table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteRecord {
    /// Row identifier rendered as text, `None` if the column was NULL
    pub id: Option<String>,
    /// Raw URL text, not yet validated
    pub url: String,
}

/// Paged source of root websites
pub trait WebsiteSource {
    /// Reads up to `limit` websites starting at row `offset`
    ///
    /// Rows are returned in a stable order so consecutive pages never
    /// overlap. An empty result means the source is exhausted.
    fn fetch_batch(&self, offset: u64, limit: u32) -> StorageResult<Vec<WebsiteRecord>>;
}

/// Destination for harvested e-mails
pub trait EmailStore {
    /// Stores the comma-separated e-mails for a website
    ///
    /// # Returns
    ///
    /// The number of rows updated
    fn update_emails(&mut self, id: &str, emails: &str) -> StorageResult<usize>;
}
