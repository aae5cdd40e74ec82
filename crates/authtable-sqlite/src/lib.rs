//! # authtable-sqlite
//!
//! SQLite storage collaborator for `authtable-core`.
//!
//! Each auth entity lives in its own [`SqliteTable`], sharing one
//! [`Database`] handle. Column names come from the adapter's column maps via
//! [`AuthSchemas`], so a deployment that renames `id` to `user_pk` gets a
//! table with a `user_pk` column and an adapter that asks for it.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use authtable_core::{AuthAdapter, ColumnMaps};
//! use authtable_sqlite::{AuthSchemas, Database, SqliteTable};
//!
//! let columns = ColumnMaps::default();
//! let schemas = AuthSchemas::new(&columns);
//! let db = Database::open("data/auth.db")?;
//! schemas.create_all(&db).await?;
//!
//! let adapter = AuthAdapter::with_columns(
//!     Arc::new(SqliteTable::new(db.clone(), schemas.user)),
//!     Arc::new(SqliteTable::new(db.clone(), schemas.session)),
//!     Arc::new(SqliteTable::new(db, schemas.key)),
//!     columns,
//! );
//! ```

pub mod db;
pub mod error;
pub mod schema;
pub mod table;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{SqliteError, SqliteResult};
pub use schema::{AuthSchemas, ColumnDef, ColumnKind, TableSchema};
pub use table::SqliteTable;
