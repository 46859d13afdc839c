//! Persistent database errors.

use thiserror::Error;

/// Errors that can occur when interacting with the database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An error occurred when interacting with the SQLite database.
    #[error("sqlite: {0}")]
    Driver(#[from] sqlx::Error),

    /// A column did not hold what the journal wrote into it.
    #[error("conversion: {0}")]
    MismatchedTypes(String),
}
