//! Adapter configuration.
//!
//! Column overrides can be supplied in code through
//! [`ColumnMap::with_overrides`] or loaded from TOML:
//!
//! ```toml
//! [columns.user]
//! id = "user_pk"
//!
//! [columns.key]
//! hashed_password = "password_hash"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::column::{ColumnMap, ColumnMaps};
use crate::error::{AuthError, AuthResult};

/// Per-entity overrides, canonical field name to storage column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnConfig {
    pub user: BTreeMap<String, String>,
    pub session: BTreeMap<String, String>,
    pub key: BTreeMap<String, String>,
}

/// Top-level adapter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    pub columns: ColumnConfig,
}

impl AdapterConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> AuthResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading adapter config");
        let text = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Resolve the configured overrides into frozen column maps.
    pub fn column_maps(&self) -> AuthResult<ColumnMaps> {
        Ok(ColumnMaps {
            user: ColumnMap::from_names(&self.columns.user)?,
            session: ColumnMap::from_names(&self.columns.session)?,
            key: ColumnMap::from_names(&self.columns.key)?,
        })
    }
}
