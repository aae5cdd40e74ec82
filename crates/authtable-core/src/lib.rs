//! # authtable-core
//!
//! Auth storage adapter for relational tables whose column names are chosen
//! by the host application.
//!
//! The auth library persists three entities (users, sessions and credential
//! keys) through the [`AuthStore`] trait. [`AuthAdapter`] implements it on
//! top of three [`Table`] collaborators, translating canonical field names to
//! storage columns, checking that referenced users exist before dependent
//! writes, and turning storage uniqueness failures into domain errors.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  AuthAdapter (AuthStore entrypoints)         │
//! ├──────────────────────────────────────────────┤
//! │  UserStore   SessionStore   KeyStore         │
//! ├──────────────────────────────────────────────┤
//! │  ColumnMap   IntegrityChecker   insert_unique│
//! ├──────────────────────────────────────────────┤
//! │  Table (host-supplied collaborator)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use authtable_core::{AuthAdapter, AuthStore, MemoryTable};
//!
//! let adapter = AuthAdapter::new(
//!     Arc::new(MemoryTable::with_unique("auth_user", "id")),
//!     Arc::new(MemoryTable::with_unique("auth_session", "id")),
//!     Arc::new(MemoryTable::with_unique("auth_key", "id")),
//! );
//! let user = adapter.set_user("u1", Default::default(), None).await?;
//! ```

pub mod adapter;
pub mod column;
pub mod config;
pub mod entity;
pub mod error;
pub mod integrity;
pub mod memory;
pub mod store;
pub mod table;
pub mod translate;

// ── re-exports ───────────────────────────────────────────────────────

pub use adapter::{AuthAdapter, AuthStore};
pub use column::{ColumnMap, ColumnMaps};
pub use config::{AdapterConfig, ColumnConfig};
pub use entity::{
    Field, Key, KeyField, Session, SessionAndUser, SessionField, User, UserAttributes, UserField,
};
pub use error::{AuthError, AuthResult};
pub use integrity::IntegrityChecker;
pub use memory::{MemoryTable, MemoryTableError};
pub use store::{KeyStore, SessionStore, UserStore};
pub use table::{BoxError, FieldRef, Filter, Row, Table, TableResult};
