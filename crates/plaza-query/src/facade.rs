//! Read façade: the single entry point for request handlers.
//!
//! Each operation describes the table once, hands that same descriptor to
//! the engine and packages metadata, rows and pagination into one response.
//! No validation happens here beyond what the catalog and engine already do.

use std::sync::Arc;

use plaza_store::Row;
use serde::Serialize;

use crate::catalog::TableDescriptor;
use crate::engine::{GroupCount, QueryEngine};
use crate::error::QueryError;
use crate::filter::Filter;
use crate::pagination::{PageRequest, Pagination};
use crate::policy::TablePolicy;

/// Response of [`ReadFacade::read_table`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRead {
    pub metadata: TableDescriptor,
    pub data: Vec<Row>,
    pub pagination: Pagination,
    pub table_config: TablePolicy,
}

/// Response of [`ReadFacade::read_filtered`]. `totalRecords` is the size of
/// the returned slice; this path runs no count statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredRead {
    pub metadata: TableDescriptor,
    pub data: Vec<Row>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub metadata: TableDescriptor,
    pub table_config: TablePolicy,
}

#[derive(Clone)]
pub struct ReadFacade {
    engine: Arc<QueryEngine>,
}

impl ReadFacade {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<QueryEngine> {
        &self.engine
    }

    /// One page of `table` with full-set pagination and the table's policy.
    pub async fn read_table(
        &self,
        table: &str,
        filter: Option<&Filter>,
        page: PageRequest,
    ) -> Result<TableRead, QueryError> {
        let catalog = self.engine.catalog();
        let metadata = catalog.describe(table).await?;
        let result = self.engine.fetch_page_in(&metadata, filter, page).await?;

        Ok(TableRead {
            metadata,
            data: result.rows,
            pagination: Pagination::new(page, result.total_count),
            table_config: catalog.policy_for(table),
        })
    }

    /// One page of rows where `field = value`.
    pub async fn read_filtered(
        &self,
        table: &str,
        field: &str,
        value: &str,
        page: PageRequest,
    ) -> Result<FilteredRead, QueryError> {
        let metadata = self.engine.catalog().describe(table).await?;
        let data = self
            .engine
            .fetch_filtered_page_in(&metadata, field, value, page)
            .await?;
        let pagination = Pagination::new(page, data.len() as u64);

        Ok(FilteredRead {
            metadata,
            data,
            pagination,
        })
    }

    /// Visible columns and policy of `table`. Unknown tables describe as empty.
    pub async fn describe_table(&self, table: &str) -> Result<TableMetadata, QueryError> {
        let catalog = self.engine.catalog();
        let metadata = catalog.describe(table).await?;
        Ok(TableMetadata {
            metadata,
            table_config: catalog.policy_for(table),
        })
    }

    /// Row counts grouped by `field`.
    pub async fn count_by(&self, table: &str, field: &str) -> Result<Vec<GroupCount>, QueryError> {
        self.engine.count_by(table, field).await
    }
}
