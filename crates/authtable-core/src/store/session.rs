//! Session persistence.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::column::ColumnMaps;
use crate::entity::{self, Field, Session, SessionAndUser, SessionField};
use crate::error::AuthResult;
use crate::integrity::IntegrityChecker;
use crate::store::user::find_user;
use crate::table::{Row, Table};
use crate::translate::{Conflict, insert_unique};

/// CRUD operations on sessions, plus the session-to-user join.
pub struct SessionStore<S: ?Sized, U: ?Sized> {
    sessions: Arc<S>,
    users: Arc<U>,
    integrity: IntegrityChecker<U>,
    columns: Arc<ColumnMaps>,
}

impl<S: ?Sized, U: ?Sized> Clone for SessionStore<S, U> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            users: Arc::clone(&self.users),
            integrity: self.integrity.clone(),
            columns: Arc::clone(&self.columns),
        }
    }
}

impl<S, U> SessionStore<S, U>
where
    S: Table + ?Sized,
    U: Table + ?Sized,
{
    /// Create a session store over the session and user tables.
    pub fn new(sessions: Arc<S>, users: Arc<U>, columns: Arc<ColumnMaps>) -> Self {
        let integrity = IntegrityChecker::new(Arc::clone(&users), Arc::clone(&columns));
        Self {
            sessions,
            users,
            integrity,
            columns,
        }
    }

    fn decode(&self, row: Row) -> AuthResult<Session> {
        entity::from_row(SessionField::ENTITY, self.columns.session.to_canonical(row))
    }

    /// Fetch a session by id, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> AuthResult<Option<Session>> {
        let filter = self.columns.session.field(SessionField::Id).eq(id);
        let rows = self.sessions.select_where(&filter).await?;
        rows.into_iter().next().map(|row| self.decode(row)).transpose()
    }

    /// Every session belonging to `user_id`, in no particular order.
    #[instrument(skip(self))]
    pub async fn get_by_user_id(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        let filter = self.columns.session.field(SessionField::UserId).eq(user_id);
        let rows = self.sessions.select_where(&filter).await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Look up a session and then its user. `None` if either is missing.
    #[instrument(skip(self))]
    pub async fn get_with_user(&self, session_id: &str) -> AuthResult<Option<SessionAndUser>> {
        let Some(session) = self.get(session_id).await? else {
            return Ok(None);
        };
        let Some(user) = find_user(&*self.users, &self.columns, &session.user_id).await? else {
            debug!(session_id, user_id = %session.user_id, "session references a missing user");
            return Ok(None);
        };
        Ok(Some(SessionAndUser { user, session }))
    }

    /// Store a new session for an existing user.
    ///
    /// Fails with `InvalidUserId` before writing if the user is missing, and
    /// with `DuplicateSessionId` if storage rejects the insert.
    #[instrument(skip(self, session), fields(session_id = %session.id, user_id = %session.user_id))]
    pub async fn create(&self, session: &Session) -> AuthResult<()> {
        self.integrity.ensure_user_exists(&session.user_id).await?;

        let row = self
            .columns
            .session
            .to_storage(entity::to_row(SessionField::ENTITY, session)?);
        insert_unique(&*self.sessions, row, Conflict::SessionId, &session.id).await?;
        debug!("session created");
        Ok(())
    }

    /// Delete every session whose id is in `ids`. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub async fn delete(&self, ids: &[&str]) -> AuthResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let filter = self
            .columns
            .session
            .field(SessionField::Id)
            .is_in(ids.iter().copied());
        let removed = self.sessions.delete_where(&filter).await?;
        debug!(removed, "sessions deleted");
        Ok(())
    }

    /// Delete every session belonging to `user_id`.
    #[instrument(skip(self))]
    pub async fn delete_by_user_id(&self, user_id: &str) -> AuthResult<()> {
        let filter = self.columns.session.field(SessionField::UserId).eq(user_id);
        let removed = self.sessions.delete_where(&filter).await?;
        debug!(user_id, removed, "user sessions deleted");
        Ok(())
    }
}
