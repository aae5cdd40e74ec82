//! Table schemas with caller-chosen column names.
//!
//! A [`TableSchema`] tells a [`SqliteTable`](crate::SqliteTable) which columns
//! exist and how to decode them; SQLite's own typing is too loose to tell a
//! boolean from an integer on the way back. [`AuthSchemas`] derives the three
//! auth tables from the adapter's column maps so the storage names always
//! agree with what the adapter will ask for.

use authtable_core::{ColumnMaps, KeyField, SessionField, UserField};
use tracing::info;

use crate::db::Database;
use crate::error::SqliteResult;

/// How a column's values are stored and decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Stored as `INTEGER` 0/1, decoded back to a JSON boolean.
    Boolean,
}

impl ColumnKind {
    fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

/// One column declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            primary: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Real)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Boolean)
    }

    /// Allow `NULL`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Make this the table's primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    fn sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.kind.sql_type());
        if self.primary {
            sql.push_str(" PRIMARY KEY");
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// A table name plus its column declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column.
    pub fn column(mut self, def: ColumnDef) -> Self {
        self.columns.push(def);
        self
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDef::sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.name),
            columns.join(", ")
        )
    }

    /// Comma-separated quoted column list, in declaration order.
    pub(crate) fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schemas for the three auth tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSchemas {
    pub user: TableSchema,
    pub session: TableSchema,
    pub key: TableSchema,
}

impl AuthSchemas {
    /// Derive `auth_user`, `auth_session` and `auth_key` from the adapter's
    /// column maps. The user table starts with only its id column.
    pub fn new(columns: &ColumnMaps) -> Self {
        let user = TableSchema::new("auth_user")
            .column(ColumnDef::text(columns.user.column(UserField::Id)).primary());

        let mut session = TableSchema::new("auth_session");
        for (field, name) in columns.session.iter() {
            session = session.column(match field {
                SessionField::Id => ColumnDef::text(name).primary(),
                SessionField::UserId => ColumnDef::text(name),
                SessionField::ActiveExpires | SessionField::IdleExpires => ColumnDef::integer(name),
            });
        }

        let mut key = TableSchema::new("auth_key");
        for (field, name) in columns.key.iter() {
            key = key.column(match field {
                KeyField::Id => ColumnDef::text(name).primary(),
                KeyField::UserId => ColumnDef::text(name),
                KeyField::PrimaryKey => ColumnDef::boolean(name),
                KeyField::HashedPassword => ColumnDef::text(name).nullable(),
                KeyField::Expires => ColumnDef::integer(name).nullable(),
            });
        }

        Self { user, session, key }
    }

    /// Add a user attribute column.
    pub fn with_user_column(mut self, def: ColumnDef) -> Self {
        self.user.columns.push(def);
        self
    }

    /// Rename the three tables.
    pub fn with_table_names(
        mut self,
        user: impl Into<String>,
        session: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.user.name = user.into();
        self.session.name = session.into();
        self.key.name = key.into();
        self
    }

    /// Create all three tables in one transaction.
    pub async fn create_all(&self, db: &Database) -> SqliteResult<()> {
        let statements = [
            self.user.create_sql(),
            self.session.create_sql(),
            self.key.create_sql(),
        ];
        db.execute_mut(move |conn| {
            let tx = conn.transaction()?;
            for sql in &statements {
                tx.execute_batch(sql)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;
        info!(
            user = %self.user.name,
            session = %self.session.name,
            key = %self.key.name,
            "auth tables ready"
        );
        Ok(())
    }
}
