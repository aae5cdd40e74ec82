//! Error types for the authtable-core crate.
//!
//! Every adapter operation returns [`AuthError`] via [`AuthResult`]. The
//! domain variants mirror the auth library's error codes; failures raised by
//! the storage collaborator are carried in [`AuthError::Storage`] untouched.

use thiserror::Error;

use crate::table::BoxError;

/// Alias for `Result<T, AuthError>`.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors surfaced by the adapter.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A session or key referenced a user that does not exist.
    #[error("user does not exist: {user_id}")]
    InvalidUserId { user_id: String },

    /// Inserting a session was rejected by storage.
    #[error("duplicate session id: {session_id}")]
    DuplicateSessionId { session_id: String },

    /// Inserting a key was rejected by storage.
    #[error("duplicate key id: {key_id}")]
    DuplicateKeyId { key_id: String },

    /// A column-mapping override could not be applied.
    #[error("invalid column selector for {entity}: {reason}")]
    InvalidColumnSelector { entity: &'static str, reason: String },

    /// A stored row could not be decoded into its canonical shape.
    #[error("malformed {entity} row: {source}")]
    MalformedRow {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Adapter configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Failure raised by the storage collaborator.
    #[error("storage error: {0}")]
    Storage(#[from] BoxError),
}

impl AuthError {
    /// The auth library's error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUserId { .. } => "AUTH_INVALID_USER_ID",
            Self::DuplicateSessionId { .. } => "AUTH_DUPLICATE_SESSION_ID",
            Self::DuplicateKeyId { .. } => "AUTH_DUPLICATE_KEY_ID",
            Self::InvalidColumnSelector { .. } => "AUTH_INVALID_COLUMN_SELECTOR",
            Self::MalformedRow { .. } | Self::Config(_) | Self::Storage(_) => "UNKNOWN_ERROR",
        }
    }

    pub(crate) fn invalid_selector(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidColumnSelector {
            entity,
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_auth_library() {
        let err = AuthError::InvalidUserId {
            user_id: "u1".into(),
        };
        assert_eq!(err.code(), "AUTH_INVALID_USER_ID");

        let err = AuthError::DuplicateSessionId {
            session_id: "s1".into(),
        };
        assert_eq!(err.code(), "AUTH_DUPLICATE_SESSION_ID");

        let err = AuthError::DuplicateKeyId {
            key_id: "k1".into(),
        };
        assert_eq!(err.code(), "AUTH_DUPLICATE_KEY_ID");
    }

    #[test]
    fn storage_errors_keep_their_message() {
        let inner: BoxError = "connection reset".into();
        let err = AuthError::from(inner);
        assert_eq!(err.code(), "UNKNOWN_ERROR");
        assert_eq!(err.to_string(), "storage error: connection reset");
    }
}
