//! Referential-integrity precondition for dependent writes.
//!
//! Sessions and keys must point at an existing user at write time. The check
//! is a plain count followed, by the caller, by a separate insert: a user
//! deleted between the two can still end up referenced. That race is left to
//! the storage collaborator.

use std::sync::Arc;

use tracing::debug;

use crate::column::ColumnMaps;
use crate::entity::UserField;
use crate::error::{AuthError, AuthResult};
use crate::table::Table;

/// Verifies that a referenced user exists before a dependent row is written.
pub struct IntegrityChecker<U: ?Sized> {
    users: Arc<U>,
    columns: Arc<ColumnMaps>,
}

impl<U: ?Sized> Clone for IntegrityChecker<U> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            columns: Arc::clone(&self.columns),
        }
    }
}

impl<U: Table + ?Sized> IntegrityChecker<U> {
    pub fn new(users: Arc<U>, columns: Arc<ColumnMaps>) -> Self {
        Self { users, columns }
    }

    /// Fail with [`AuthError::InvalidUserId`] unless a user with `user_id`
    /// exists. Storage failures during the count propagate unchanged.
    pub async fn ensure_user_exists(&self, user_id: &str) -> AuthResult<()> {
        let filter = self.columns.user.field(UserField::Id).eq(user_id);
        let count = self.users.count_where(&filter).await?;
        if count == 0 {
            debug!(user_id, "referenced user does not exist");
            return Err(AuthError::InvalidUserId {
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }
}
