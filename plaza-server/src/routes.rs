//! Table read endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use plaza_query::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use plaza_query::{
    DateRange, Filter, FilteredRead, GroupCount, PageRequest, QueryError, TableMetadata,
    TableRead,
};
use plaza_store::StoreError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::metrics::{FAILED, INVALID, OK};
use crate::AppState;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Validation failures are the caller's fault (400); everything else is ours (500).
pub(crate) fn query_failure(
    state: &AppState,
    endpoint: &'static str,
    err: QueryError,
) -> (StatusCode, String) {
    if err.is_validation() {
        state.metrics.record(endpoint, INVALID);
        warn!("{} rejected: {}", endpoint, err);
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        state.metrics.record(endpoint, FAILED);
        error!("{} failed: {}", endpoint, err);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Query failed: {}", err))
    }
}

pub(crate) fn store_failure(
    state: &AppState,
    endpoint: &'static str,
    err: StoreError,
) -> (StatusCode, String) {
    query_failure(state, endpoint, QueryError::Store(err))
}

pub(crate) fn rejected(
    state: &AppState,
    endpoint: &'static str,
    status: StatusCode,
    message: String,
) -> (StatusCode, String) {
    state.metrics.record(endpoint, INVALID);
    (status, message)
}

fn page_request(page: Option<u32>, page_size: Option<u32>) -> PageRequest {
    PageRequest::new(
        page.unwrap_or(DEFAULT_PAGE),
        page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/tables/:table
pub async fn describe_table(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<TableMetadata>, (StatusCode, String)> {
    const ENDPOINT: &str = "table_metadata";

    let meta = state
        .facade
        .describe_table(&table)
        .await
        .map_err(|e| query_failure(&state, ENDPOINT, e))?;

    if meta.metadata.is_empty() {
        return Err(rejected(
            &state,
            ENDPOINT,
            StatusCode::NOT_FOUND,
            format!("Table '{}' not found", table),
        ));
    }

    state.metrics.record(ENDPOINT, OK);
    Ok(Json(meta))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub city: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DataParams {
    /// No city and no dates means an unfiltered read; anything else is a
    /// region read and the engine insists on a city.
    fn filter(&self) -> Result<Option<Filter>, QueryError> {
        let date_range = match (self.start, self.end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
            (None, None) => None,
            (Some(day), None) | (None, Some(day)) => Some(DateRange::new(day, day)?),
        };

        if self.city.is_none() && date_range.is_none() {
            return Ok(None);
        }
        Ok(Some(Filter::Region {
            city: self.city.clone(),
            date_range,
        }))
    }
}

/// GET /api/tables/:table/data
pub async fn read_table(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<DataParams>,
) -> Result<Json<TableRead>, (StatusCode, String)> {
    const ENDPOINT: &str = "table_data";

    let filter = params
        .filter()
        .map_err(|e| query_failure(&state, ENDPOINT, e))?;
    let read = state
        .facade
        .read_table(
            &table,
            filter.as_ref(),
            page_request(params.page, params.page_size),
        )
        .await
        .map_err(|e| query_failure(&state, ENDPOINT, e))?;

    state.metrics.record_rows(ENDPOINT, read.data.len());
    Ok(Json(read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub field: String,
    pub value: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET /api/tables/:table/filter
pub async fn read_filtered(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Json<FilteredRead>, (StatusCode, String)> {
    const ENDPOINT: &str = "table_filter";

    let read = state
        .facade
        .read_filtered(
            &table,
            &params.field,
            &params.value,
            page_request(params.page, params.page_size),
        )
        .await
        .map_err(|e| query_failure(&state, ENDPOINT, e))?;

    state.metrics.record_rows(ENDPOINT, read.data.len());
    Ok(Json(read))
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub field: String,
}

/// GET /api/tables/:table/counts
pub async fn count_by(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<CountParams>,
) -> Result<Json<Vec<GroupCount>>, (StatusCode, String)> {
    const ENDPOINT: &str = "table_counts";

    let groups = state
        .facade
        .count_by(&table, &params.field)
        .await
        .map_err(|e| query_failure(&state, ENDPOINT, e))?;

    state.metrics.record_rows(ENDPOINT, groups.len());
    Ok(Json(groups))
}
