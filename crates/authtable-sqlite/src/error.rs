//! Error types for the authtable-sqlite crate.
//!
//! All table operations return [`SqliteError`] via [`SqliteResult`]. When
//! handed to the adapter they are boxed and travel as untyped storage errors.

use thiserror::Error;

/// Alias for `Result<T, SqliteError>`.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Errors raised by the SQLite collaborator.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A row or filter referenced a column the table does not declare.
    #[error("unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },

    /// An invalid argument was provided to a table operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for SqliteError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
