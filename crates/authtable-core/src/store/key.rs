//! Credential key persistence.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::column::ColumnMaps;
use crate::entity::{self, Field, Key, KeyField};
use crate::error::AuthResult;
use crate::integrity::IntegrityChecker;
use crate::table::{Row, Table};
use crate::translate::{Conflict, insert_unique};

/// CRUD operations on credential keys.
pub struct KeyStore<K: ?Sized, U: ?Sized> {
    keys: Arc<K>,
    integrity: IntegrityChecker<U>,
    columns: Arc<ColumnMaps>,
}

impl<K: ?Sized, U: ?Sized> Clone for KeyStore<K, U> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            integrity: self.integrity.clone(),
            columns: Arc::clone(&self.columns),
        }
    }
}

impl<K, U> KeyStore<K, U>
where
    K: Table + ?Sized,
    U: Table + ?Sized,
{
    /// Create a key store over the key and user tables.
    pub fn new(keys: Arc<K>, users: Arc<U>, columns: Arc<ColumnMaps>) -> Self {
        let integrity = IntegrityChecker::new(users, Arc::clone(&columns));
        Self {
            keys,
            integrity,
            columns,
        }
    }

    fn decode(&self, row: Row) -> AuthResult<Key> {
        entity::from_row(KeyField::ENTITY, self.columns.key.to_canonical(row))
    }

    /// Fetch a key by id, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> AuthResult<Option<Key>> {
        let filter = self.columns.key.field(KeyField::Id).eq(id);
        let rows = self.keys.select_where(&filter).await?;
        rows.into_iter().next().map(|row| self.decode(row)).transpose()
    }

    /// Every key belonging to `user_id`; empty when there are none.
    #[instrument(skip(self))]
    pub async fn get_by_user_id(&self, user_id: &str) -> AuthResult<Vec<Key>> {
        let filter = self.columns.key.field(KeyField::UserId).eq(user_id);
        let rows = self.keys.select_where(&filter).await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Store a new key for an existing user.
    #[instrument(skip(self, key), fields(key_id = %key.id, user_id = %key.user_id))]
    pub async fn create(&self, key: &Key) -> AuthResult<()> {
        self.integrity.ensure_user_exists(&key.user_id).await?;

        let row = self.columns.key.to_storage(entity::to_row(KeyField::ENTITY, key)?);
        insert_unique(&*self.keys, row, Conflict::KeyId, &key.id).await?;
        debug!(primary = key.primary_key, "key created");
        Ok(())
    }

    /// Replace the hashed password of a key. `None` clears it.
    #[instrument(skip(self, hashed_password))]
    pub async fn update_password(&self, id: &str, hashed_password: Option<&str>) -> AuthResult<()> {
        let mut changes = Row::new();
        changes.insert(
            self.columns.key.column(KeyField::HashedPassword).to_string(),
            hashed_password.map_or(Value::Null, |h| Value::String(h.to_string())),
        );
        let filter = self.columns.key.field(KeyField::Id).eq(id);
        let changed = self.keys.update_where(&filter, changes).await?;
        debug!(key_id = %id, changed, "key password updated");
        Ok(())
    }

    /// Delete a key unless it is the user's primary key.
    ///
    /// Both conditions go to storage as one conjunction, so a primary key is
    /// never touched even when its id matches.
    #[instrument(skip(self))]
    pub async fn delete_non_primary(&self, id: &str) -> AuthResult<()> {
        let filter = self
            .columns
            .key
            .field(KeyField::PrimaryKey)
            .eq(false)
            .and(self.columns.key.field(KeyField::Id).eq(id));
        let removed = self.keys.delete_where(&filter).await?;
        debug!(key_id = %id, removed, "non-primary key deleted");
        Ok(())
    }

    /// Delete every key belonging to `user_id`, primary or not.
    #[instrument(skip(self))]
    pub async fn delete_by_user_id(&self, user_id: &str) -> AuthResult<()> {
        let filter = self.columns.key.field(KeyField::UserId).eq(user_id);
        let removed = self.keys.delete_where(&filter).await?;
        debug!(user_id, removed, "user keys deleted");
        Ok(())
    }
}
