//! In-process [`Table`] implementation.
//!
//! [`MemoryTable`] keeps rows in a `Vec` behind a `tokio` `RwLock` and
//! enforces uniqueness on the columns it is told about. It is meant for tests
//! and prototypes; nothing is persisted.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::table::{Filter, Row, Table, TableResult};

/// Errors raised by [`MemoryTable`].
#[derive(Debug, Error)]
pub enum MemoryTableError {
    /// A write would duplicate a value in a unique column.
    #[error("unique constraint failed: {table}.{column} = {value}")]
    UniqueViolation {
        table: String,
        column: String,
        value: Value,
    },
}

/// A table held entirely in memory.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    unique: Vec<String>,
    rows: RwLock<Vec<Row>>,
}

impl MemoryTable {
    /// Create an empty table with no unique columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: Vec::new(),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Create an empty table whose `column` must be unique.
    pub fn with_unique(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name).unique(column)
    }

    /// Declare another unique column.
    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique.push(column.into());
        self
    }

    /// The table's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of every stored row.
    pub async fn rows(&self) -> Vec<Row> {
        self.rows.read().await.clone()
    }

    /// Remove every row.
    pub async fn clear(&self) {
        self.rows.write().await.clear();
    }

    /// Check `candidate` against every other row's unique columns.
    fn check_unique(&self, rows: &[Row], candidate: &Row, skip: Option<usize>) -> Result<(), MemoryTableError> {
        for column in &self.unique {
            let Some(value) = candidate.get(column) else {
                continue;
            };
            let clash = rows
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, r)| r.get(column) == Some(value));
            if clash {
                return Err(MemoryTableError::UniqueViolation {
                    table: self.name.clone(),
                    column: column.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Table for MemoryTable {
    async fn select_all(&self) -> TableResult<Vec<Row>> {
        Ok(self.rows.read().await.clone())
    }

    async fn select_where(&self, filter: &Filter) -> TableResult<Vec<Row>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn insert(&self, row: Row) -> TableResult<Row> {
        let mut rows = self.rows.write().await;
        self.check_unique(&rows, &row, None)?;
        rows.push(row.clone());
        debug!(table = %self.name, "row inserted");
        Ok(row)
    }

    async fn update_where(&self, filter: &Filter, changes: Row) -> TableResult<u64> {
        let mut rows = self.rows.write().await;
        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .map(|(i, _)| i)
            .collect();

        // Stage the whole update, so updated rows are checked against each
        // other as well as the untouched ones. Nothing is written on failure.
        let mut staged = rows.clone();
        for &i in &targets {
            staged[i].extend(changes.clone());
        }
        for &i in &targets {
            self.check_unique(&staged, &staged[i], Some(i))?;
        }
        *rows = staged;
        Ok(targets.len() as u64)
    }

    async fn delete_where(&self, filter: &Filter) -> TableResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }

    async fn count_where(&self, filter: &Filter) -> TableResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| filter.matches(r)).count() as u64)
    }
}
