//! Filter requests accepted by the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }
}

/// Predicate requested by a caller. "No predicate" is `Option::<Filter>::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field = value`; the field must exist on the table.
    Equality { field: String, value: String },
    /// Rows of one partition (city / plaza), optionally within a date range.
    Region {
        city: Option<String>,
        date_range: Option<DateRange>,
    },
}

impl Filter {
    pub fn equality(field: &str, value: &str) -> Self {
        Filter::Equality {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn city(city: &str) -> Self {
        Filter::Region {
            city: Some(city.to_string()),
            date_range: None,
        }
    }

    pub fn city_in_range(city: &str, range: DateRange) -> Self {
        Filter::Region {
            city: Some(city.to_string()),
            date_range: Some(range),
        }
    }
}
