//! [`Table`] implementation over one SQLite table.
//!
//! Filters are rendered to parameterised SQL with quoted identifiers; values
//! never enter the query text. Rows are decoded column by column according to
//! the [`TableSchema`], so booleans survive the round trip through SQLite's
//! integer storage.

use std::sync::Arc;

use async_trait::async_trait;
use authtable_core::{Filter, Row, Table, TableResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{SqliteError, SqliteResult};
use crate::schema::{ColumnKind, TableSchema, quote_ident};

/// One SQLite table addressed through the adapter's collaborator contract.
#[derive(Clone)]
pub struct SqliteTable {
    db: Database,
    schema: Arc<TableSchema>,
}

impl SqliteTable {
    /// Wrap an existing table.
    pub fn new(db: Database, schema: TableSchema) -> Self {
        Self {
            db,
            schema: Arc::new(schema),
        }
    }

    /// Create the table if it does not exist yet, then wrap it.
    pub async fn create(db: Database, schema: TableSchema) -> SqliteResult<Self> {
        let sql = schema.create_sql();
        db.execute(move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await?;
        debug!(table = %schema.name, "table created");
        Ok(Self::new(db, schema))
    }

    /// The schema this table was opened with.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Remove every row. Returns the number of rows removed.
    #[instrument(skip(self), fields(table = %self.schema.name))]
    pub async fn truncate(&self) -> SqliteResult<u64> {
        let sql = format!("DELETE FROM {}", quote_ident(&self.schema.name));
        let removed = self.db.execute(move |conn| Ok(conn.execute(&sql, [])?)).await?;
        debug!(removed, "table truncated");
        Ok(removed as u64)
    }

    /// Count every row.
    pub async fn count_all(&self) -> SqliteResult<u64> {
        self.count(&Filter::And(Vec::new())).await
    }

    async fn select(&self, filter: Option<&Filter>) -> SqliteResult<Vec<Row>> {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.schema.select_list(),
            quote_ident(&self.schema.name)
        );
        let mut params = Vec::new();
        if let Some(filter) = filter {
            let clause = render_filter(&self.schema, filter, &mut params)?;
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        let schema = Arc::clone(&self.schema);
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), |row| read_row(&schema, row))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    #[instrument(skip(self, row), fields(table = %self.schema.name))]
    async fn insert_row(&self, row: Row) -> SqliteResult<Row> {
        if row.is_empty() {
            return Err(SqliteError::InvalidArgument(format!(
                "cannot insert an empty row into {}",
                self.schema.name
            )));
        }

        let mut columns = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (column, value) in &row {
            known_column(&self.schema, column)?;
            columns.push(quote_ident(column));
            params.push(to_sql_value(value));
        }
        let table = quote_ident(&self.schema.name);
        let insert = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            vec!["?"; params.len()].join(", ")
        );
        let select = format!(
            "SELECT {} FROM {table} WHERE rowid = ?1",
            self.schema.select_list()
        );

        let schema = Arc::clone(&self.schema);
        let stored = self
            .db
            .execute(move |conn| {
                conn.execute(&insert, params_from_iter(params.iter()))?;
                let rowid = conn.last_insert_rowid();
                Ok(conn.query_row(&select, [rowid], |r| read_row(&schema, r))?)
            })
            .await?;
        debug!("row inserted");
        Ok(stored)
    }

    #[instrument(skip(self, filter, changes), fields(table = %self.schema.name))]
    async fn update(&self, filter: &Filter, changes: Row) -> SqliteResult<u64> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(changes.len());
        let mut params = Vec::with_capacity(changes.len());
        for (column, value) in &changes {
            known_column(&self.schema, column)?;
            assignments.push(format!("{} = ?", quote_ident(column)));
            params.push(to_sql_value(value));
        }
        let clause = render_filter(&self.schema, filter, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {clause}",
            quote_ident(&self.schema.name),
            assignments.join(", ")
        );

        let changed = self
            .db
            .execute(move |conn| Ok(conn.execute(&sql, params_from_iter(params.iter()))?))
            .await?;
        debug!(changed, "rows updated");
        Ok(changed as u64)
    }

    #[instrument(skip(self, filter), fields(table = %self.schema.name))]
    async fn delete(&self, filter: &Filter) -> SqliteResult<u64> {
        let mut params = Vec::new();
        let clause = render_filter(&self.schema, filter, &mut params)?;
        let sql = format!("DELETE FROM {} WHERE {clause}", quote_ident(&self.schema.name));

        let removed = self
            .db
            .execute(move |conn| Ok(conn.execute(&sql, params_from_iter(params.iter()))?))
            .await?;
        debug!(removed, "rows deleted");
        Ok(removed as u64)
    }

    async fn count(&self, filter: &Filter) -> SqliteResult<u64> {
        let mut params = Vec::new();
        let clause = render_filter(&self.schema, filter, &mut params)?;
        let sql = format!(
            "SELECT count(*) FROM {} WHERE {clause}",
            quote_ident(&self.schema.name)
        );

        let count: i64 = self
            .db
            .execute(move |conn| {
                Ok(conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?)
            })
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl Table for SqliteTable {
    async fn select_all(&self) -> TableResult<Vec<Row>> {
        Ok(self.select(None).await?)
    }

    async fn select_where(&self, filter: &Filter) -> TableResult<Vec<Row>> {
        Ok(self.select(Some(filter)).await?)
    }

    async fn insert(&self, row: Row) -> TableResult<Row> {
        Ok(self.insert_row(row).await?)
    }

    async fn update_where(&self, filter: &Filter, changes: Row) -> TableResult<u64> {
        Ok(self.update(filter, changes).await?)
    }

    async fn delete_where(&self, filter: &Filter) -> TableResult<u64> {
        Ok(self.delete(filter).await?)
    }

    async fn count_where(&self, filter: &Filter) -> TableResult<u64> {
        Ok(self.count(filter).await?)
    }
}

// ── SQL rendering ────────────────────────────────────────────────────

fn known_column(schema: &TableSchema, column: &str) -> SqliteResult<()> {
    match schema.get(column) {
        Some(_) => Ok(()),
        None => Err(SqliteError::UnknownColumn {
            table: schema.name.clone(),
            column: column.to_string(),
        }),
    }
}

/// Render `filter` as a WHERE fragment, appending its bound values.
fn render_filter(schema: &TableSchema, filter: &Filter, params: &mut Vec<SqlValue>) -> SqliteResult<String> {
    match filter {
        Filter::Eq { column, value } => {
            known_column(schema, column)?;
            if value.is_null() {
                return Ok(format!("{} IS NULL", quote_ident(column)));
            }
            params.push(to_sql_value(value));
            Ok(format!("{} = ?", quote_ident(column)))
        }
        Filter::In { column, values } => {
            known_column(schema, column)?;
            if values.is_empty() {
                return Ok("0".to_string());
            }
            params.extend(values.iter().map(to_sql_value));
            Ok(format!(
                "{} IN ({})",
                quote_ident(column),
                vec!["?"; values.len()].join(", ")
            ))
        }
        Filter::And(parts) => {
            if parts.is_empty() {
                return Ok("1".to_string());
            }
            let rendered = parts
                .iter()
                .map(|p| render_filter(schema, p, params).map(|sql| format!("({sql})")))
                .collect::<SqliteResult<Vec<_>>>()?;
            Ok(rendered.join(" AND "))
        }
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_json(kind: ColumnKind, value: SqlValue) -> Value {
    match (kind, value) {
        (_, SqlValue::Null) => Value::Null,
        (ColumnKind::Boolean, SqlValue::Integer(n)) => Value::Bool(n != 0),
        (_, SqlValue::Integer(n)) => Value::from(n),
        (_, SqlValue::Real(f)) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        (_, SqlValue::Text(s)) => Value::String(s),
        (_, SqlValue::Blob(bytes)) => Value::String(BASE64.encode(bytes)),
    }
}

fn read_row(schema: &TableSchema, row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (i, column) in schema.columns.iter().enumerate() {
        let value: SqlValue = row.get(i)?;
        out.insert(column.name.clone(), to_json(column.kind, value));
    }
    Ok(out)
}
