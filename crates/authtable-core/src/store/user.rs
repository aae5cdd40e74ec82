//! User persistence.
//!
//! Users carry an id plus whatever attribute columns the host application
//! defines. Attribute columns are not part of the column map and pass
//! through under their storage names.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::column::ColumnMaps;
use crate::entity::{self, Field, Key, KeyField, User, UserAttributes, UserField};
use crate::error::AuthResult;
use crate::table::Table;
use crate::translate::{Conflict, insert_unique};

/// CRUD operations on users.
pub struct UserStore<U: ?Sized, K: ?Sized> {
    users: Arc<U>,
    keys: Arc<K>,
    columns: Arc<ColumnMaps>,
}

impl<U: ?Sized, K: ?Sized> Clone for UserStore<U, K> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            keys: Arc::clone(&self.keys),
            columns: Arc::clone(&self.columns),
        }
    }
}

impl<U, K> UserStore<U, K>
where
    U: Table + ?Sized,
    K: Table + ?Sized,
{
    /// Create a user store over the user and key tables.
    pub fn new(users: Arc<U>, keys: Arc<K>, columns: Arc<ColumnMaps>) -> Self {
        Self {
            users,
            keys,
            columns,
        }
    }

    /// Fetch a user by id, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> AuthResult<Option<User>> {
        find_user(&*self.users, &self.columns, id).await
    }

    /// Delete a user. Sessions and keys are left in place.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> AuthResult<()> {
        let filter = self.columns.user.field(UserField::Id).eq(id);
        let removed = self.users.delete_where(&filter).await?;
        debug!(user_id = %id, removed, "user deleted");
        Ok(())
    }

    /// Insert a user, and optionally its first key.
    ///
    /// The two inserts are independent: if the key is rejected the user row
    /// stays and the key failure is returned as `DuplicateKeyId`.
    #[instrument(skip(self, attributes, key))]
    pub async fn create(
        &self,
        id: &str,
        attributes: UserAttributes,
        key: Option<Key>,
    ) -> AuthResult<User> {
        let mut canonical = attributes;
        canonical.insert(UserField::Id.name().to_string(), Value::String(id.to_string()));
        let row = self.columns.user.to_storage_with_extras(canonical);

        let stored = self.users.insert(row).await?;
        let user = entity::from_row(UserField::ENTITY, self.columns.user.to_canonical_with_extras(stored))?;
        debug!(user_id = %id, "user created");

        if let Some(key) = key {
            let key_row = self.columns.key.to_storage(entity::to_row(KeyField::ENTITY, &key)?);
            if let Err(err) = insert_unique(&*self.keys, key_row, Conflict::KeyId, &key.id).await {
                warn!(user_id = %id, key_id = %key.id, "user created without its key");
                return Err(err);
            }
            debug!(user_id = %id, key_id = %key.id, "key created with user");
        }

        Ok(user)
    }

    /// Overwrite the supplied attributes of a user, leaving every other
    /// column untouched.
    #[instrument(skip(self, attributes))]
    pub async fn update_attributes(&self, id: &str, attributes: UserAttributes) -> AuthResult<()> {
        // The id only selects the row, under either its canonical or storage name.
        let mut attributes = attributes;
        let id_column = self.columns.user.column(UserField::Id);
        let had_canonical = attributes.remove(UserField::Id.name()).is_some();
        let had_storage = attributes.remove(id_column).is_some();
        if had_canonical || had_storage {
            debug!(user_id = %id, "ignoring id in attribute update");
        }
        if attributes.is_empty() {
            debug!(user_id = %id, "no attributes to update");
            return Ok(());
        }

        let changes = self.columns.user.to_storage_with_extras(attributes);
        let filter = self.columns.user.field(UserField::Id).eq(id);
        let changed = self.users.update_where(&filter, changes).await?;
        debug!(user_id = %id, changed, "user attributes updated");
        Ok(())
    }
}

/// Single-row user lookup shared with the session join.
pub(crate) async fn find_user<U: Table + ?Sized>(
    users: &U,
    columns: &ColumnMaps,
    id: &str,
) -> AuthResult<Option<User>> {
    let filter = columns.user.field(UserField::Id).eq(id);
    let rows = users.select_where(&filter).await?;
    rows.into_iter()
        .next()
        .map(|row| entity::from_row(UserField::ENTITY, columns.user.to_canonical_with_extras(row)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnMap;
    use crate::error::AuthError;
    use crate::memory::MemoryTable;
    use serde_json::json;

    fn attrs(value: Value) -> UserAttributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn store_with(columns: ColumnMaps) -> (UserStore<MemoryTable, MemoryTable>, Arc<MemoryTable>, Arc<MemoryTable>) {
        let id_column = columns.user.column(UserField::Id).to_string();
        let key_column = columns.key.column(KeyField::Id).to_string();
        let users = Arc::new(MemoryTable::with_unique("auth_user", id_column));
        let keys = Arc::new(MemoryTable::with_unique("auth_key", key_column));
        let store = UserStore::new(Arc::clone(&users), Arc::clone(&keys), Arc::new(columns));
        (store, users, keys)
    }

    fn store() -> (UserStore<MemoryTable, MemoryTable>, Arc<MemoryTable>, Arc<MemoryTable>) {
        store_with(ColumnMaps::default())
    }

    fn primary_key(id: &str, user_id: &str) -> Key {
        Key {
            id: id.into(),
            user_id: user_id.into(),
            primary_key: true,
            hashed_password: Some("h1".into()),
            expires: None,
        }
    }

    #[tokio::test]
    async fn create_and_get() {
        let (store, _, _) = store();
        let created = store
            .create("u1", attrs(json!({"username": "alice"})), None)
            .await
            .unwrap();
        assert_eq!(created.id, "u1");
        assert_eq!(created.attributes["username"], json!("alice"));

        let fetched = store.get("u1").await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let (store, _, _) = store();
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_with_key_writes_both_rows() {
        let (store, _, keys) = store();
        store
            .create("u1", UserAttributes::new(), Some(primary_key("email:a", "u1")))
            .await
            .unwrap();

        let rows = keys.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["primary_key"], json!(true));
    }

    #[tokio::test]
    async fn duplicate_key_leaves_user_behind() {
        let (store, users, _) = store();
        store
            .create("u1", UserAttributes::new(), Some(primary_key("email:a", "u1")))
            .await
            .unwrap();

        let err = store
            .create("u2", UserAttributes::new(), Some(primary_key("email:a", "u2")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateKeyId { .. }));
        assert_eq!(users.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_user_is_not_translated() {
        let (store, _, _) = store();
        store.create("u1", UserAttributes::new(), None).await.unwrap();
        let err = store
            .create("u1", UserAttributes::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
    }

    #[tokio::test]
    async fn update_touches_only_supplied_attributes() {
        let (store, _, _) = store();
        store
            .create("u1", attrs(json!({"username": "alice", "email": "a@x"})), None)
            .await
            .unwrap();

        store
            .update_attributes("u1", attrs(json!({"username": "bob"})))
            .await
            .unwrap();

        let user = store.get("u1").await.unwrap().unwrap();
        assert_eq!(user.attributes["username"], json!("bob"));
        assert_eq!(user.attributes["email"], json!("a@x"));
    }

    #[tokio::test]
    async fn empty_update_is_a_no_op() {
        let (store, users, _) = store();
        store.create("u1", UserAttributes::new(), None).await.unwrap();
        store
            .update_attributes("u1", attrs(json!({"id": "u9"})))
            .await
            .unwrap();
        assert_eq!(users.rows().await[0]["id"], json!("u1"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, users, _) = store();
        store.create("u1", UserAttributes::new(), None).await.unwrap();
        store.delete("u1").await.unwrap();
        store.delete("u1").await.unwrap();
        assert!(users.rows().await.is_empty());
    }

    #[tokio::test]
    async fn remapped_id_column() {
        let columns = ColumnMaps::default()
            .with_user(ColumnMap::with_overrides([(UserField::Id, "user_pk")]).unwrap());
        let (store, users, _) = store_with(columns);

        store.create("u1", UserAttributes::new(), None).await.unwrap();

        let raw = users.rows().await;
        assert_eq!(Value::Object(raw[0].clone()), json!({"user_pk": "u1"}));

        let user = store.get("u1").await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.attributes.is_empty());
    }

    #[tokio::test]
    async fn remapped_id_column_cannot_be_rewritten() {
        let columns = ColumnMaps::default()
            .with_user(ColumnMap::with_overrides([(UserField::Id, "user_pk")]).unwrap());
        let (store, users, _) = store_with(columns);
        store
            .create("u1", attrs(json!({"username": "alice"})), None)
            .await
            .unwrap();

        store
            .update_attributes("u1", attrs(json!({"user_pk": "u9", "id": "u8", "username": "bob"})))
            .await
            .unwrap();

        assert!(store.get("u9").await.unwrap().is_none());
        assert!(store.get("u8").await.unwrap().is_none());
        let user = store.get("u1").await.unwrap().unwrap();
        assert_eq!(user.attributes["username"], json!("bob"));

        let raw = users.rows().await;
        assert_eq!(
            Value::Object(raw[0].clone()),
            json!({"user_pk": "u1", "username": "bob"})
        );
    }

    #[tokio::test]
    async fn remapped_id_only_update_is_a_no_op() {
        let columns = ColumnMaps::default()
            .with_user(ColumnMap::with_overrides([(UserField::Id, "user_pk")]).unwrap());
        let (store, users, _) = store_with(columns);
        store.create("u1", UserAttributes::new(), None).await.unwrap();

        store
            .update_attributes("u1", attrs(json!({"user_pk": "u9"})))
            .await
            .unwrap();

        assert_eq!(Value::Object(users.rows().await[0].clone()), json!({"user_pk": "u1"}));
    }
}
