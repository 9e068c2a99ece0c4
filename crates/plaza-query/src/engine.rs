//! Query engine: validated, parameterized page reads over described tables.

use std::sync::Arc;

use plaza_store::{QueryOutput, Row, StoreError};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::{SchemaCatalog, TableDescriptor};
use crate::error::QueryError;
use crate::filter::Filter;
use crate::pagination::{PageRequest, PageResult, DEFAULT_MAX_PAGE_SIZE};
use crate::predicate::Predicate;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Column holding the partition (city / plaza) value.
    pub partition_column: String,
    /// Largest accepted `pageSize`.
    pub max_page_size: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            partition_column: "plaza".to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Row count for one distinct value of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub value: Value,
    pub total: u64,
}

pub struct QueryEngine {
    catalog: Arc<SchemaCatalog>,
    options: EngineOptions,
}

impl QueryEngine {
    pub fn new(catalog: Arc<SchemaCatalog>, options: EngineOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Read one page of `table` plus the size of the full matching set.
    ///
    /// The page and count statements share one predicate and run
    /// concurrently. All validation happens before either is issued.
    pub async fn fetch_page(
        &self,
        table: &str,
        filter: Option<&Filter>,
        page: PageRequest,
    ) -> Result<PageResult, QueryError> {
        page.bounds(self.options.max_page_size)?;
        let descriptor = self.catalog.describe(table).await?;
        self.fetch_page_in(&descriptor, filter, page).await
    }

    /// [`fetch_page`](Self::fetch_page) against a descriptor the caller
    /// already holds. The catalog is not consulted for columns again.
    pub async fn fetch_page_in(
        &self,
        descriptor: &TableDescriptor,
        filter: Option<&Filter>,
        page: PageRequest,
    ) -> Result<PageResult, QueryError> {
        let bounds = page.bounds(self.options.max_page_size)?;
        let table_ref = descriptor.table_ref()?;
        let policy = self.catalog.policy_for(descriptor.table());
        let predicate = Predicate::build(
            descriptor,
            &policy,
            filter,
            &self.options.partition_column,
        )?;

        let (data_sql, data_params) = predicate.page_query(&table_ref, bounds);
        let count_sql = predicate.count_query(&table_ref);
        debug!("fetch_page data: {} {:?}", data_sql, data_params);
        debug!("fetch_page count: {} {:?}", count_sql, predicate.params());

        let store = self.catalog.store();
        let (data, count) = tokio::try_join!(
            store.execute(&data_sql, &data_params),
            store.execute(&count_sql, predicate.params()),
        )?;

        let total_count = parse_count(&count)?;
        debug!(
            "fetch_page '{}': {} rows of {} (page {}, size {})",
            table_ref.name(),
            data.rows.len(),
            total_count,
            page.page,
            page.page_size
        );

        Ok(PageResult {
            rows: data.rows,
            total_count,
        })
    }

    /// Read one page of rows where `field = value`, without a paired count.
    pub async fn fetch_filtered_page(
        &self,
        table: &str,
        field: &str,
        value: &str,
        page: PageRequest,
    ) -> Result<Vec<Row>, QueryError> {
        page.bounds(self.options.max_page_size)?;
        let descriptor = self.catalog.describe(table).await?;
        self.fetch_filtered_page_in(&descriptor, field, value, page)
            .await
    }

    /// [`fetch_filtered_page`](Self::fetch_filtered_page) against a held descriptor.
    pub async fn fetch_filtered_page_in(
        &self,
        descriptor: &TableDescriptor,
        field: &str,
        value: &str,
        page: PageRequest,
    ) -> Result<Vec<Row>, QueryError> {
        let bounds = page.bounds(self.options.max_page_size)?;
        let table_ref = descriptor.table_ref()?;
        let column = descriptor.column(field)?;

        let (sql, params) = Predicate::equality(&column, value).page_query(&table_ref, bounds);
        debug!("fetch_filtered_page: {} {:?}", sql, params);

        let output = self.catalog.store().execute(&sql, &params).await?;
        Ok(output.rows)
    }

    /// Row counts per distinct value of `field`.
    pub async fn count_by(&self, table: &str, field: &str) -> Result<Vec<GroupCount>, QueryError> {
        let descriptor = self.catalog.describe(table).await?;
        let table_ref = descriptor.table_ref()?;
        let column = descriptor.column(field)?;

        let sql = format!(
            "SELECT {col} AS value, COUNT(*) AS total FROM {table} GROUP BY {col} ORDER BY {col}",
            col = column,
            table = table_ref
        );
        debug!("count_by: {}", sql);

        let output = self.catalog.store().execute(&sql, &[]).await?;
        output
            .rows
            .into_iter()
            .map(|mut row| {
                let total = row
                    .get("total")
                    .and_then(value_as_count)
                    .ok_or_else(|| StoreError::Decode("group count is not an integer".to_string()))?;
                let value = row.remove("value").unwrap_or(Value::Null);
                Ok(GroupCount { value, total })
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(QueryError::from)
    }
}

/// Read the `total` of a `SELECT COUNT(*) AS total` result.
fn parse_count(output: &QueryOutput) -> Result<u64, StoreError> {
    output
        .rows
        .first()
        .and_then(|row| row.get("total"))
        .and_then(value_as_count)
        .ok_or_else(|| StoreError::Decode("count query returned no integer total".to_string()))
}

/// Counts arrive as JSON numbers from Postgres, but accept numeric strings too.
fn value_as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output(total: Value) -> QueryOutput {
        let mut row = Row::new();
        row.insert("total".to_string(), total);
        QueryOutput::from_rows(vec![row])
    }

    #[test]
    fn test_parse_count_number() {
        assert_eq!(parse_count(&output(json!(42))).unwrap(), 42);
    }

    #[test]
    fn test_parse_count_string() {
        assert_eq!(parse_count(&output(json!("17"))).unwrap(), 17);
    }

    #[test]
    fn test_parse_count_rejects_garbage() {
        assert!(matches!(
            parse_count(&output(json!("many"))),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            parse_count(&output(json!(-1))),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            parse_count(&QueryOutput::default()),
            Err(StoreError::Decode(_))
        ));
    }
}
