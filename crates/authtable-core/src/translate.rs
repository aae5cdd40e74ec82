//! Uniqueness-violation translation around inserts.
//!
//! Only the insert of a session or key is wrapped. Whatever the collaborator
//! raises there is replaced by the matching domain error and the original
//! detail is logged, then dropped. Every other storage failure propagates
//! untouched.

use tracing::warn;

use crate::error::{AuthError, AuthResult};
use crate::table::{Row, Table};

/// Which domain error an insert failure becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    SessionId,
    KeyId,
}

impl Conflict {
    /// Build the domain error for the row identified by `id`.
    pub fn into_error(self, id: &str) -> AuthError {
        match self {
            Self::SessionId => AuthError::DuplicateSessionId {
                session_id: id.to_string(),
            },
            Self::KeyId => AuthError::DuplicateKeyId {
                key_id: id.to_string(),
            },
        }
    }
}

/// Insert `row`, replacing any storage failure with `conflict`'s error.
pub async fn insert_unique<T: Table + ?Sized>(
    table: &T,
    row: Row,
    conflict: Conflict,
    id: &str,
) -> AuthResult<Row> {
    table.insert(row).await.map_err(|err| {
        warn!(id, ?conflict, error = %err, "insert rejected by storage");
        conflict.into_error(id)
    })
}
