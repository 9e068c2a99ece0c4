//! Page requests, bounds and page metadata.

use plaza_store::Row;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// `LIMIT` / `OFFSET` values ready to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Validate against `max_page_size` and compute `offset = (page - 1) * page_size`.
    pub fn bounds(&self, max_page_size: u32) -> Result<PageBounds, ValidationError> {
        if self.page < 1 {
            return Err(ValidationError::InvalidPagination(
                "page must be at least 1".to_string(),
            ));
        }
        if self.page_size < 1 {
            return Err(ValidationError::InvalidPagination(
                "pageSize must be at least 1".to_string(),
            ));
        }
        if self.page_size > max_page_size {
            return Err(ValidationError::PageSizeTooLarge {
                requested: self.page_size,
                max: max_page_size,
            });
        }

        let offset = u64::from(self.page - 1) * u64::from(self.page_size);
        let offset = i64::try_from(offset).map_err(|_| {
            ValidationError::InvalidPagination(format!("page {} is out of range", self.page))
        })?;

        Ok(PageBounds {
            limit: i64::from(self.page_size),
            offset,
        })
    }
}

/// One page of rows with the size of the full matching set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub rows: Vec<Row>,
    pub total_count: u64,
}

/// Page metadata returned alongside rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total_records: u64) -> Self {
        let size = u64::from(request.page_size.max(1));
        Self {
            page: request.page,
            page_size: request.page_size,
            total_records,
            total_pages: total_records.div_ceil(size),
        }
    }
}
