//! The facade handed to the auth library.
//!
//! [`AuthStore`] is the fixed set of entrypoints the auth library calls.
//! [`AuthAdapter`] implements it by composing the user, session and key
//! stores over three host-supplied [`Table`] handles. The adapter itself
//! holds no mutable state: the column maps are frozen at construction and
//! every call is independent.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::column::ColumnMaps;
use crate::config::AdapterConfig;
use crate::entity::{Key, Session, SessionAndUser, User, UserAttributes};
use crate::error::AuthResult;
use crate::store::{KeyStore, SessionStore, UserStore};
use crate::table::Table;

/// Persistence entrypoints required by the auth library.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Look up a session and its user; `None` if either is missing.
    async fn get_session_and_user(&self, session_id: &str) -> AuthResult<Option<SessionAndUser>>;

    /// Delete the sessions with the given ids.
    async fn delete_session(&self, session_ids: &[&str]) -> AuthResult<()>;

    /// Delete every session of a user.
    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AuthResult<()>;

    async fn get_session(&self, session_id: &str) -> AuthResult<Option<Session>>;

    async fn get_sessions_by_user_id(&self, user_id: &str) -> AuthResult<Vec<Session>>;

    /// Store a session. Fails with `InvalidUserId` or `DuplicateSessionId`.
    async fn set_session(&self, session: &Session) -> AuthResult<()>;

    /// Delete every key of a user, primary included.
    async fn delete_keys_by_user_id(&self, user_id: &str) -> AuthResult<()>;

    /// Delete a key unless it is a primary key.
    async fn delete_non_primary_key(&self, key_id: &str) -> AuthResult<()>;

    /// Delete a user. Does not cascade.
    async fn delete_user(&self, user_id: &str) -> AuthResult<()>;

    async fn get_key(&self, key_id: &str) -> AuthResult<Option<Key>>;

    async fn get_keys_by_user_id(&self, user_id: &str) -> AuthResult<Vec<Key>>;

    async fn get_user(&self, user_id: &str) -> AuthResult<Option<User>>;

    /// Store a key. Fails with `InvalidUserId` or `DuplicateKeyId`.
    async fn set_key(&self, key: &Key) -> AuthResult<()>;

    /// Create a user, optionally with its first key. Not transactional.
    async fn set_user(
        &self,
        user_id: &str,
        attributes: UserAttributes,
        key: Option<Key>,
    ) -> AuthResult<User>;

    async fn update_key_password(&self, key_id: &str, hashed_password: Option<&str>) -> AuthResult<()>;

    /// Overwrite only the supplied user attributes.
    async fn update_user_attributes(&self, user_id: &str, attributes: UserAttributes) -> AuthResult<()>;
}

/// [`AuthStore`] implementation over three tables.
pub struct AuthAdapter<U: ?Sized, S: ?Sized, K: ?Sized> {
    columns: Arc<ColumnMaps>,
    users: UserStore<U, K>,
    sessions: SessionStore<S, U>,
    keys: KeyStore<K, U>,
}

impl<U: ?Sized, S: ?Sized, K: ?Sized> Clone for AuthAdapter<U, S, K> {
    fn clone(&self) -> Self {
        Self {
            columns: Arc::clone(&self.columns),
            users: self.users.clone(),
            sessions: self.sessions.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl<U, S, K> AuthAdapter<U, S, K>
where
    U: Table + ?Sized,
    S: Table + ?Sized,
    K: Table + ?Sized,
{
    /// Build an adapter whose tables use the canonical column names.
    pub fn new(users: Arc<U>, sessions: Arc<S>, keys: Arc<K>) -> Self {
        Self::with_columns(users, sessions, keys, ColumnMaps::default())
    }

    /// Build an adapter with explicit column mappings.
    pub fn with_columns(users: Arc<U>, sessions: Arc<S>, keys: Arc<K>, columns: ColumnMaps) -> Self {
        debug!(?columns, "building auth adapter");
        let columns = Arc::new(columns);
        Self {
            users: UserStore::new(Arc::clone(&users), Arc::clone(&keys), Arc::clone(&columns)),
            sessions: SessionStore::new(sessions, Arc::clone(&users), Arc::clone(&columns)),
            keys: KeyStore::new(keys, users, Arc::clone(&columns)),
            columns,
        }
    }

    /// Build an adapter with column mappings read from configuration.
    pub fn from_config(
        users: Arc<U>,
        sessions: Arc<S>,
        keys: Arc<K>,
        config: &AdapterConfig,
    ) -> AuthResult<Self> {
        let columns = config.column_maps()?;
        Ok(Self::with_columns(users, sessions, keys, columns))
    }

    /// The frozen column mappings.
    pub fn columns(&self) -> &ColumnMaps {
        &self.columns
    }

    pub fn users(&self) -> &UserStore<U, K> {
        &self.users
    }

    pub fn sessions(&self) -> &SessionStore<S, U> {
        &self.sessions
    }

    pub fn keys(&self) -> &KeyStore<K, U> {
        &self.keys
    }
}

#[async_trait]
impl<U, S, K> AuthStore for AuthAdapter<U, S, K>
where
    U: Table + ?Sized + 'static,
    S: Table + ?Sized + 'static,
    K: Table + ?Sized + 'static,
{
    async fn get_session_and_user(&self, session_id: &str) -> AuthResult<Option<SessionAndUser>> {
        self.sessions.get_with_user(session_id).await
    }

    async fn delete_session(&self, session_ids: &[&str]) -> AuthResult<()> {
        self.sessions.delete(session_ids).await
    }

    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AuthResult<()> {
        self.sessions.delete_by_user_id(user_id).await
    }

    async fn get_session(&self, session_id: &str) -> AuthResult<Option<Session>> {
        self.sessions.get(session_id).await
    }

    async fn get_sessions_by_user_id(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        self.sessions.get_by_user_id(user_id).await
    }

    async fn set_session(&self, session: &Session) -> AuthResult<()> {
        self.sessions.create(session).await
    }

    async fn delete_keys_by_user_id(&self, user_id: &str) -> AuthResult<()> {
        self.keys.delete_by_user_id(user_id).await
    }

    async fn delete_non_primary_key(&self, key_id: &str) -> AuthResult<()> {
        self.keys.delete_non_primary(key_id).await
    }

    async fn delete_user(&self, user_id: &str) -> AuthResult<()> {
        self.users.delete(user_id).await
    }

    async fn get_key(&self, key_id: &str) -> AuthResult<Option<Key>> {
        self.keys.get(key_id).await
    }

    async fn get_keys_by_user_id(&self, user_id: &str) -> AuthResult<Vec<Key>> {
        self.keys.get_by_user_id(user_id).await
    }

    async fn get_user(&self, user_id: &str) -> AuthResult<Option<User>> {
        self.users.get(user_id).await
    }

    async fn set_key(&self, key: &Key) -> AuthResult<()> {
        self.keys.create(key).await
    }

    async fn set_user(
        &self,
        user_id: &str,
        attributes: UserAttributes,
        key: Option<Key>,
    ) -> AuthResult<User> {
        self.users.create(user_id, attributes, key).await
    }

    async fn update_key_password(&self, key_id: &str, hashed_password: Option<&str>) -> AuthResult<()> {
        self.keys.update_password(key_id, hashed_password).await
    }

    async fn update_user_attributes(&self, user_id: &str, attributes: UserAttributes) -> AuthResult<()> {
        self.users.update_attributes(user_id, attributes).await
    }
}
