//! Error types for catalog lookups and query execution.

use chrono::NaiveDate;
use plaza_store::StoreError;
use thiserror::Error;

/// Caller-supplied input that cannot be turned into a safe query.
///
/// Raised before any statement is sent to the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Table '{0}' does not exist or exposes no columns")]
    UnknownTable(String),

    #[error("Field '{field}' does not exist on table '{table}'")]
    UnknownField { table: String, field: String },

    #[error("Partition identifier (city) is required to read table '{0}'")]
    PartitionRequired(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Page size {requested} exceeds the maximum of {max}")]
    PageSizeTooLarge { requested: u32, max: u32 },

    #[error("Date range start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Failure of a catalog or engine operation.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, QueryError::Validation(_))
    }
}
