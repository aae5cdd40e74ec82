//! Canonical-to-storage column resolution.
//!
//! A [`ColumnMap`] starts as the identity mapping for an entity's field set,
//! has caller overrides merged over it once at construction, and is then
//! frozen. Every read translates storage rows back to canonical shape and
//! every write translates the other way.

use std::collections::{BTreeMap, HashSet};

use crate::entity::{Field, KeyField, SessionField, UserField};
use crate::error::{AuthError, AuthResult};
use crate::table::{FieldRef, Row};

/// Frozen mapping from an entity's canonical fields to storage columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap<F: Field> {
    /// One entry per field, in `F::ALL` order.
    columns: Vec<(F, String)>,
}

impl<F: Field> Default for ColumnMap<F> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<F: Field> ColumnMap<F> {
    /// The mapping where every storage column carries its canonical name.
    pub fn identity() -> Self {
        Self {
            columns: F::ALL.iter().map(|f| (*f, f.name().to_string())).collect(),
        }
    }

    /// Merge `overrides` over the identity mapping.
    ///
    /// Fails with [`AuthError::InvalidColumnSelector`] when a column name is
    /// empty or two fields would resolve to the same column.
    pub fn with_overrides<I, S>(overrides: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = (F, S)>,
        S: Into<String>,
    {
        let mut map = Self::identity();
        for (field, column) in overrides {
            let column = column.into();
            if column.trim().is_empty() {
                return Err(AuthError::invalid_selector(
                    F::ENTITY,
                    format!("empty column name for `{}`", field.name()),
                ));
            }
            if let Some(slot) = map.columns.iter_mut().find(|(f, _)| *f == field) {
                slot.1 = column;
            }
        }

        let mut seen = HashSet::new();
        for (field, column) in &map.columns {
            if !seen.insert(column.as_str()) {
                return Err(AuthError::invalid_selector(
                    F::ENTITY,
                    format!("column `{column}` selected by more than one field (`{}`)", field.name()),
                ));
            }
        }
        Ok(map)
    }

    /// Merge overrides keyed by canonical field name, as read from config.
    pub fn from_names(overrides: &BTreeMap<String, String>) -> AuthResult<Self> {
        let parsed = overrides
            .iter()
            .map(|(name, column)| {
                F::parse(name)
                    .map(|f| (f, column.clone()))
                    .ok_or_else(|| AuthError::invalid_selector(F::ENTITY, format!("unknown field `{name}`")))
            })
            .collect::<AuthResult<Vec<_>>>()?;
        Self::with_overrides(parsed)
    }

    /// The storage column for `field`.
    pub fn column(&self, field: F) -> &str {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, c)| c.as_str())
            .unwrap_or_else(|| field.name())
    }

    /// Start a predicate on `field`.
    pub fn field(&self, field: F) -> FieldRef<'_> {
        FieldRef::new(self.column(field))
    }

    /// Iterate `(field, column)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, c.as_str()))
    }

    /// Rename canonical keys to storage columns, keeping only mapped fields
    /// present in the input.
    pub fn to_storage(&self, mut canonical: Row) -> Row {
        let mut out = Row::new();
        for (field, column) in &self.columns {
            if let Some(value) = canonical.remove(field.name()) {
                out.insert(column.clone(), value);
            }
        }
        out
    }

    /// Like [`to_storage`](Self::to_storage), but unmapped keys pass through
    /// unchanged. Mapped fields win on a name clash.
    pub fn to_storage_with_extras(&self, mut canonical: Row) -> Row {
        let mapped: Vec<_> = self
            .columns
            .iter()
            .filter_map(|(f, c)| canonical.remove(f.name()).map(|v| (c.clone(), v)))
            .collect();
        canonical.extend(mapped);
        canonical
    }

    /// Rename storage columns back to canonical keys, keeping only mapped
    /// fields present in the row.
    pub fn to_canonical(&self, mut stored: Row) -> Row {
        let mut out = Row::new();
        for (field, column) in &self.columns {
            if let Some(value) = stored.remove(column) {
                out.insert(field.name().to_string(), value);
            }
        }
        out
    }

    /// Like [`to_canonical`](Self::to_canonical), but unmapped columns pass
    /// through unchanged. Mapped fields win on a name clash.
    pub fn to_canonical_with_extras(&self, mut stored: Row) -> Row {
        let mapped: Vec<_> = self
            .columns
            .iter()
            .filter_map(|(f, c)| stored.remove(c).map(|v| (f.name().to_string(), v)))
            .collect();
        stored.extend(mapped);
        stored
    }
}

/// The three per-entity maps the adapter is built with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMaps {
    pub user: ColumnMap<UserField>,
    pub session: ColumnMap<SessionField>,
    pub key: ColumnMap<KeyField>,
}

impl ColumnMaps {
    /// Identity mappings for every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user mapping.
    pub fn with_user(mut self, map: ColumnMap<UserField>) -> Self {
        self.user = map;
        self
    }

    /// Replace the session mapping.
    pub fn with_session(mut self, map: ColumnMap<SessionField>) -> Self {
        self.session = map;
        self
    }

    /// Replace the key mapping.
    pub fn with_key(mut self, map: ColumnMap<KeyField>) -> Self {
        self.key = map;
        self
    }
}
