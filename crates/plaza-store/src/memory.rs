//! In-memory store with scripted responses.
//!
//! Columns are registered per table up front; statements are answered by a
//! responder closure and every statement is recorded so callers can assert
//! exactly what SQL would have reached the database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::value::{QueryOutput, Row, SqlValue};
use crate::{ColumnInfo, Store};

type Responder = dyn Fn(&str, &[SqlValue]) -> Result<QueryOutput, StoreError> + Send + Sync;

/// A statement as received by [`MemoryStore::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub struct MemoryStore {
    tables: HashMap<String, Vec<ColumnInfo>>,
    responder: Box<Responder>,
    statements: Mutex<Vec<RecordedStatement>>,
    introspections: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store: no tables, every statement returns no rows.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            responder: Box::new(|_, _| Ok(QueryOutput::default())),
            statements: Mutex::new(Vec::new()),
            introspections: AtomicUsize::new(0),
        }
    }

    /// Register the columns reported for `schema.table`.
    pub fn with_table(mut self, schema: &str, table: &str, columns: Vec<ColumnInfo>) -> Self {
        self.tables.insert(format!("{}.{}", schema, table), columns);
        self
    }

    /// Answer statements with `responder`.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str, &[SqlValue]) -> Result<QueryOutput, StoreError> + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    /// Serve a fixed row set as if every predicate matched all of it.
    ///
    /// `SELECT COUNT(*)` statements get one `{"total": n}` row; any other
    /// statement is treated as a page read whose last two parameters are
    /// `LIMIT` and `OFFSET`.
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        self.with_responder(move |sql, params| {
            if sql.starts_with("SELECT COUNT(*)") {
                let mut total = Row::new();
                total.insert("total".to_string(), Value::from(rows.len() as i64));
                return Ok(QueryOutput::from_rows(vec![total]));
            }
            let (limit, offset) = match params {
                [.., SqlValue::BigInt(limit), SqlValue::BigInt(offset)] => {
                    (*limit as usize, *offset as usize)
                }
                _ => (rows.len(), 0),
            };
            let page = rows.iter().skip(offset).take(limit).cloned().collect();
            Ok(QueryOutput::from_rows(page))
        })
    }

    /// Every statement executed so far, in order.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// How many times columns were introspected.
    pub fn introspection_count(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn introspect_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, StoreError> {
        self.introspections.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables
            .get(&format!("{}.{}", schema, table))
            .cloned()
            .unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, StoreError> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedStatement {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        (self.responder)(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> Row {
        let mut r = Row::new();
        r.insert("id".to_string(), Value::from(id));
        r
    }

    #[tokio::test]
    async fn test_unknown_table_has_no_columns() {
        let store = MemoryStore::new();
        let cols = store.introspect_columns("public", "missing").await.unwrap();
        assert!(cols.is_empty());
        assert_eq!(store.introspection_count(), 1);
    }

    #[tokio::test]
    async fn test_registered_table_columns() {
        let store = MemoryStore::new().with_table(
            "public",
            "spots",
            vec![ColumnInfo::new("client_id", "character varying", "varchar")],
        );
        let cols = store.introspect_columns("public", "spots").await.unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name, "client_id");
        assert!(store.introspect_columns("other", "spots").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statements_are_recorded() {
        let store = MemoryStore::new();
        store
            .execute("SELECT * FROM t WHERE a = $1", &[SqlValue::from("x")])
            .await
            .unwrap();
        let log = store.statements();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sql, "SELECT * FROM t WHERE a = $1");
        assert_eq!(log[0].params, vec![SqlValue::Text("x".to_string())]);
    }

    #[tokio::test]
    async fn test_with_rows_slices_and_counts() {
        let store = MemoryStore::new().with_rows((0..7).map(row).collect());

        let page = store
            .execute(
                "SELECT * FROM t LIMIT $1 OFFSET $2",
                &[SqlValue::BigInt(3), SqlValue::BigInt(6)],
            )
            .await
            .unwrap();
        assert_eq!(page.rows, vec![row(6)]);

        let count = store
            .execute("SELECT COUNT(*) AS total FROM t", &[])
            .await
            .unwrap();
        assert_eq!(count.rows[0]["total"], Value::from(7));
    }

    #[tokio::test]
    async fn test_responder_errors_propagate() {
        let store = MemoryStore::new()
            .with_responder(|_, _| Err(StoreError::QueryFailed("boom".to_string())));
        let err = store.execute("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
