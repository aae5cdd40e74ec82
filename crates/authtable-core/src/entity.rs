//! Canonical entity shapes and their field sets.
//!
//! The auth library only ever sees these types. How each field is actually
//! named in storage is decided by [`ColumnMap`](crate::column::ColumnMap).

use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::table::Row;

// ═══════════════════════════════════════════════════════════════════════
//  Field sets
// ═══════════════════════════════════════════════════════════════════════

/// The set of canonical fields belonging to one entity.
pub trait Field: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Every field of the entity, in canonical order.
    const ALL: &'static [Self];

    /// The canonical field name.
    fn name(self) -> &'static str;

    /// Look up a field by its canonical name.
    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Canonical fields of a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
}

impl Field for UserField {
    const ENTITY: &'static str = "user";
    const ALL: &'static [Self] = &[Self::Id];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
        }
    }
}

/// Canonical fields of a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    Id,
    UserId,
    ActiveExpires,
    IdleExpires,
}

impl Field for SessionField {
    const ENTITY: &'static str = "session";
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::UserId,
        Self::ActiveExpires,
        Self::IdleExpires,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::UserId => "user_id",
            Self::ActiveExpires => "active_expires",
            Self::IdleExpires => "idle_expires",
        }
    }
}

/// Canonical fields of a key row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    Id,
    UserId,
    PrimaryKey,
    HashedPassword,
    Expires,
}

impl Field for KeyField {
    const ENTITY: &'static str = "key";
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::UserId,
        Self::PrimaryKey,
        Self::HashedPassword,
        Self::Expires,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::UserId => "user_id",
            Self::PrimaryKey => "primary_key",
            Self::HashedPassword => "hashed_password",
            Self::Expires => "expires",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// User-defined attributes stored alongside a user's id.
pub type UserAttributes = Row;

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier.
    pub id: String,
    /// Every other stored column, keyed by its storage name.
    #[serde(flatten)]
    pub attributes: UserAttributes,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    /// Epoch milliseconds after which the session is no longer active.
    pub active_expires: i64,
    /// Epoch milliseconds after which the session can no longer be renewed.
    pub idle_expires: i64,
}

/// A credential bound to a user, conventionally `"<provider>:<provider-id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub id: String,
    pub user_id: String,
    /// Marks the credential that established the user's identity.
    pub primary_key: bool,
    pub hashed_password: Option<String>,
    /// Epoch milliseconds, `None` for keys that never expire.
    pub expires: Option<i64>,
}

/// Result of the session-then-user join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAndUser {
    pub user: User,
    pub session: Session,
}

// ── row conversion ───────────────────────────────────────────────────

/// Encode a canonical value as a row keyed by canonical field names.
pub(crate) fn to_row<T: Serialize>(entity: &'static str, value: &T) -> AuthResult<Row> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(row)) => Ok(row),
        Ok(other) => Err(AuthError::MalformedRow {
            entity,
            source: serde::de::Error::custom(format!("expected an object, got {other}")),
        }),
        Err(source) => Err(AuthError::MalformedRow { entity, source }),
    }
}

/// Decode a row keyed by canonical field names.
pub(crate) fn from_row<T: DeserializeOwned>(entity: &'static str, row: Row) -> AuthResult<T> {
    serde_json::from_value(serde_json::Value::Object(row))
        .map_err(|source| AuthError::MalformedRow { entity, source })
}
