//! Errors of the journal stores.

use thiserror::Error;

use crate::persistent::errors::StorageError;

/// Errors that can occur when reading or writing the journal.
#[derive(Debug, Error)]
pub enum DbError {
    /// The SQLite store failed.
    #[error("sqlite: {0}")]
    Storage(#[from] StorageError),

    /// An entry could not be encoded or decoded.
    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type of the journal stores.
pub type DbResult<T> = Result<T, DbError>;
