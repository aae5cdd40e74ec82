//! The storage collaborator contract.
//!
//! The adapter never issues query text. It talks to one [`Table`] per entity
//! through a narrow select / insert / update / delete / count surface, using
//! [`Filter`] predicates whose column names have already been resolved
//! through a [`ColumnMap`](crate::column::ColumnMap).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// A row keyed by storage field names.
pub type Row = serde_json::Map<String, Value>;

/// Error type returned by storage collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Alias for `Result<T, BoxError>`.
pub type TableResult<T> = Result<T, BoxError>;

// ═══════════════════════════════════════════════════════════════════════
//  Predicates
// ═══════════════════════════════════════════════════════════════════════

/// A predicate over storage columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IN (values)`; an empty list matches nothing.
    In { column: String, values: Vec<Value> },
    /// Conjunction; an empty list matches everything.
    And(Vec<Filter>),
}

impl Filter {
    /// Combine two predicates, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Filter {
        let mut parts = match self {
            Filter::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Filter::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Filter::And(parts)
    }

    /// Evaluate the predicate against an in-memory row.
    ///
    /// A missing column compares equal to `null`.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
            Filter::In { column, values } => {
                let actual = row.get(column).unwrap_or(&Value::Null);
                values.iter().any(|v| v == actual)
            }
            Filter::And(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }

    /// Every column the predicate references.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Filter::Eq { column, .. } | Filter::In { column, .. } => vec![column.as_str()],
            Filter::And(parts) => parts.iter().flat_map(Filter::columns).collect(),
        }
    }
}

/// A storage column selected through a column map, ready for comparison.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    column: &'a str,
}

impl<'a> FieldRef<'a> {
    pub(crate) fn new(column: &'a str) -> Self {
        Self { column }
    }

    /// The resolved storage column name.
    pub fn column(&self) -> &'a str {
        self.column
    }

    /// `column = value`
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        Filter::Eq {
            column: self.column.to_string(),
            value: value.into(),
        }
    }

    /// `column IN (values)`
    pub fn is_in<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            column: self.column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Table
// ═══════════════════════════════════════════════════════════════════════

/// One relational table as seen by the adapter.
///
/// Implementations must be thread-safe. Uniqueness of the id column is the
/// implementation's responsibility: `insert` must fail when the id exists.
#[async_trait]
pub trait Table: Send + Sync {
    /// Return every row.
    async fn select_all(&self) -> TableResult<Vec<Row>>;

    /// Return the rows matching `filter`, in no particular order.
    async fn select_where(&self, filter: &Filter) -> TableResult<Vec<Row>>;

    /// Insert a row and return it as stored.
    async fn insert(&self, row: Row) -> TableResult<Row>;

    /// Overwrite the given columns on every matching row. Returns the number
    /// of rows changed.
    async fn update_where(&self, filter: &Filter, changes: Row) -> TableResult<u64>;

    /// Delete every matching row. Returns the number of rows removed.
    async fn delete_where(&self, filter: &Filter) -> TableResult<u64>;

    /// Count the matching rows.
    async fn count_where(&self, filter: &Filter) -> TableResult<u64>;
}

#[async_trait]
impl<T: Table + ?Sized> Table for Arc<T> {
    async fn select_all(&self) -> TableResult<Vec<Row>> {
        (**self).select_all().await
    }

    async fn select_where(&self, filter: &Filter) -> TableResult<Vec<Row>> {
        (**self).select_where(filter).await
    }

    async fn insert(&self, row: Row) -> TableResult<Row> {
        (**self).insert(row).await
    }

    async fn update_where(&self, filter: &Filter, changes: Row) -> TableResult<u64> {
        (**self).update_where(filter, changes).await
    }

    async fn delete_where(&self, filter: &Filter) -> TableResult<u64> {
        (**self).delete_where(filter).await
    }

    async fn count_where(&self, filter: &Filter) -> TableResult<u64> {
        (**self).count_where(filter).await
    }
}
