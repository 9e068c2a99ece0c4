//! Static per-table date-filtering policy.
//!
//! Loaded once at start from a JSON document keyed by upper-cased table name:
//!
//! ```json
//! { "CUNOTA": { "date": true, "date_field": "fecha" }, "CLIENTE": { "date": false } }
//! ```
//!
//! Tables without an entry have no date column.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use plaza_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date-filtering capability of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TablePolicy {
    #[serde(rename = "date")]
    pub has_date_column: bool,
    #[serde(rename = "date_field")]
    pub date_column: Option<String>,
}

impl TablePolicy {
    pub fn with_date_column(column: &str) -> Self {
        Self {
            has_date_column: true,
            date_column: Some(column.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read table policy file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid table policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("table '{0}' enables date filtering but sets no date_field")]
    MissingDateField(String),

    #[error("date column '{column}' configured for table '{table}' does not exist")]
    DateColumnMissing { table: String, column: String },

    #[error("failed to describe table '{table}': {source}")]
    Store { table: String, source: StoreError },
}

#[derive(Debug, Deserialize)]
struct PolicyEntry {
    #[serde(default)]
    date: bool,
    #[serde(default)]
    date_field: Option<String>,
}

/// Canonical policy key for a table name.
pub fn policy_key(table: &str) -> String {
    table.trim().to_uppercase()
}

/// Immutable lookup from table name to [`TablePolicy`].
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    entries: HashMap<String, TablePolicy>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the policy for `table`.
    pub fn with_policy(mut self, table: &str, policy: TablePolicy) -> Self {
        self.entries.insert(policy_key(table), policy);
        self
    }

    pub fn from_json(doc: &str) -> Result<Self, PolicyError> {
        let raw: HashMap<String, PolicyEntry> = serde_json::from_str(doc)?;
        let mut entries = HashMap::with_capacity(raw.len());

        for (table, entry) in raw {
            let key = policy_key(&table);
            let policy = if entry.date {
                let column = entry
                    .date_field
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| PolicyError::MissingDateField(key.clone()))?;
                TablePolicy::with_date_column(column.trim())
            } else {
                TablePolicy::default()
            };
            entries.insert(key, policy);
        }

        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let doc = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&doc)
    }

    /// Policy for `table`; unknown tables get the no-date default.
    pub fn policy_for(&self, table: &str) -> TablePolicy {
        self.entries
            .get(&policy_key(table))
            .cloned()
            .unwrap_or_default()
    }

    /// Tables whose policy names a date column, with that column.
    pub fn date_columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(table, policy)| {
            policy
                .date_column
                .as_deref()
                .filter(|_| policy.has_date_column)
                .map(|column| (table.as_str(), column))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_json_date_and_plain_tables() {
        let registry = PolicyRegistry::from_json(
            r#"{"CUNOTA": {"date": true, "date_field": "fecha"}, "CLIENTE": {"date": false}}"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.policy_for("CUNOTA"), TablePolicy::with_date_column("fecha"));
        assert_eq!(registry.policy_for("CLIENTE"), TablePolicy::default());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry =
            PolicyRegistry::from_json(r#"{"cunota": {"date": true, "date_field": "fecha"}}"#)
                .unwrap();
        assert!(registry.policy_for("CUNOTA").has_date_column);
        assert!(registry.policy_for("cunota").has_date_column);
        assert!(registry.policy_for(" CuNota ").has_date_column);
    }

    #[test]
    fn test_unknown_table_has_no_date_column() {
        let registry = PolicyRegistry::new();
        let policy = registry.policy_for("SPOTS");
        assert!(!policy.has_date_column);
        assert_eq!(policy.date_column, None);
    }

    #[test]
    fn test_date_without_field_is_rejected() {
        let err = PolicyRegistry::from_json(r#"{"CUNOTA": {"date": true, "date_field": null}}"#)
            .unwrap_err();
        assert!(matches!(err, PolicyError::MissingDateField(ref t) if t == "CUNOTA"));
    }

    #[test]
    fn test_date_field_ignored_when_disabled() {
        let registry =
            PolicyRegistry::from_json(r#"{"SPOTS": {"date": false, "date_field": "created"}}"#)
                .unwrap();
        assert_eq!(registry.policy_for("SPOTS"), TablePolicy::default());
        assert_eq!(registry.date_columns().count(), 0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            PolicyRegistry::from_json("not json"),
            Err(PolicyError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"CUNOTA": {{"date": true, "date_field": "fecha"}}}}"#).unwrap();

        let registry = PolicyRegistry::load(file.path()).unwrap();
        let cols: Vec<_> = registry.date_columns().collect();
        assert_eq!(cols, vec![("CUNOTA", "fecha")]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PolicyRegistry::load("/nonexistent/tables.json").unwrap_err();
        assert!(matches!(err, PolicyError::Io { .. }));
    }

    #[test]
    fn test_serializes_like_config() {
        let json = serde_json::to_value(TablePolicy::with_date_column("fecha")).unwrap();
        assert_eq!(json, serde_json::json!({"date": true, "date_field": "fecha"}));
    }
}
