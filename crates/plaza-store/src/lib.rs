//! Plaza Store - backing store adapters
//!
//! This crate provides the store interface consumed by the query engine:
//! - PostgreSQL via a pooled `sqlx` connection
//! - An in-memory scripted store for tests and local wiring

pub mod error;
pub mod memory;
pub mod postgres;
pub mod value;

pub use error::StoreError;
pub use memory::{MemoryStore, RecordedStatement};
pub use postgres::{redact_database_url, PgStore, PgStoreOptions};
pub use value::{QueryOutput, Row, SqlValue};

use async_trait::async_trait;
use serde::Serialize;

/// Column metadata as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// SQL standard type name, e.g. `character varying`.
    pub data_type: String,
    /// Underlying Postgres type name, e.g. `varchar` or `int4`.
    pub udt_name: String,
    pub max_length: Option<i32>,
    pub nullable: bool,
    pub default: Option<String>,
}

impl ColumnInfo {
    /// Shorthand used by tests and fixtures: nullable, no default, no length.
    pub fn new(name: &str, data_type: &str, udt_name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            udt_name: udt_name.to_string(),
            max_length: None,
            nullable: true,
            default: None,
        }
    }
}

/// Interface to the database holding the operational tables.
///
/// Implementations accept positional `$n` parameters for values only.
/// Table and column names are validated and interpolated by the caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// Return the ordered columns of `schema.table`, or an empty list when
    /// the table does not exist.
    async fn introspect_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, StoreError>;

    /// Execute a statement with bound parameters.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, StoreError>;
}
