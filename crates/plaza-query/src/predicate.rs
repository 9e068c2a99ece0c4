//! WHERE / ORDER BY construction shared by data and count statements.
//!
//! A [`Predicate`] is built once per request and rendered into both the page
//! query and the count query, so the two always filter identically. Values
//! go into `params`; the only text interpolated is identifiers obtained from
//! the table descriptor.

use plaza_store::SqlValue;
use tracing::{debug, warn};

use crate::catalog::TableDescriptor;
use crate::error::ValidationError;
use crate::filter::Filter;
use crate::ident::{ColumnRef, TableRef};
use crate::pagination::PageBounds;
use crate::policy::TablePolicy;

/// Fields are private: statement text is only ever assembled here, from
/// descriptor-issued identifiers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    /// Empty, or `" WHERE ..."`.
    where_clause: String,
    /// Empty, or `" ORDER BY ..."`. Applied to the data query only.
    order_by: String,
    params: Vec<SqlValue>,
}

impl Predicate {
    /// Match every row.
    pub fn none() -> Self {
        Self::default()
    }

    /// `field = value`, with the value cast to the column's type.
    pub fn equality(column: &ColumnRef, value: &str) -> Self {
        Self {
            where_clause: format!(" WHERE {} = {}", column, column.typed_param(1)),
            order_by: String::new(),
            params: vec![SqlValue::Text(value.to_string())],
        }
    }

    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// Values bound by the WHERE clause, in placeholder order.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Choose the predicate for `filter` against one described table.
    ///
    /// Region filters need a non-blank city. When the policy names a date
    /// column that the table really has, a date range becomes a `BETWEEN`
    /// and the absence of one orders newest first; otherwise only the
    /// partition column is filtered. Range bounds are whole days: a
    /// non-`date` column is compared by its date part.
    pub fn build(
        descriptor: &TableDescriptor,
        policy: &TablePolicy,
        filter: Option<&Filter>,
        partition_column: &str,
    ) -> Result<Self, ValidationError> {
        let (city, date_range) = match filter {
            None => return Ok(Self::none()),
            Some(Filter::Equality { field, value }) => {
                let column = descriptor.column(field)?;
                return Ok(Self::equality(&column, value));
            }
            Some(Filter::Region { city, date_range }) => (city, date_range),
        };

        let city = city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ValidationError::PartitionRequired(descriptor.table().to_string()))?;
        let plaza = descriptor.column(partition_column)?;

        let date_column = policy
            .date_column
            .as_deref()
            .filter(|_| policy.has_date_column)
            .and_then(|name| match descriptor.column(name) {
                Ok(column) => Some(column),
                Err(_) => {
                    warn!(
                        "Date column '{}' configured for '{}' is not on the table; filtering by partition only",
                        name,
                        descriptor.table()
                    );
                    None
                }
            });

        let predicate = match (date_column, date_range) {
            (Some(date), Some(range)) => Self {
                where_clause: format!(
                    " WHERE {} BETWEEN $1 AND $2 AND {} = {}",
                    date.as_date(),
                    plaza,
                    plaza.typed_param(3)
                ),
                order_by: String::new(),
                params: vec![
                    SqlValue::Date(range.start),
                    SqlValue::Date(range.end),
                    SqlValue::Text(city.to_string()),
                ],
            },
            (Some(date), None) => Self {
                where_clause: format!(" WHERE {} = {}", plaza, plaza.typed_param(1)),
                order_by: format!(" ORDER BY {} DESC", date),
                params: vec![SqlValue::Text(city.to_string())],
            },
            (None, range) => {
                if range.is_some() {
                    debug!(
                        "Ignoring date range for '{}': table has no date column",
                        descriptor.table()
                    );
                }
                Self {
                    where_clause: format!(" WHERE {} = {}", plaza, plaza.typed_param(1)),
                    order_by: String::new(),
                    params: vec![SqlValue::Text(city.to_string())],
                }
            }
        };

        Ok(predicate)
    }

    /// `SELECT *` page statement and its parameters (predicate values, then
    /// `LIMIT` and `OFFSET`).
    pub(crate) fn page_query(
        &self,
        table: &TableRef,
        bounds: PageBounds,
    ) -> (String, Vec<SqlValue>) {
        let n = self.params.len();
        let sql = format!(
            "SELECT * FROM {}{}{} LIMIT ${} OFFSET ${}",
            table,
            self.where_clause,
            self.order_by,
            n + 1,
            n + 2
        );
        let mut params = self.params.clone();
        params.push(SqlValue::BigInt(bounds.limit));
        params.push(SqlValue::BigInt(bounds.offset));
        (sql, params)
    }

    /// Count statement over the same predicate. Shares `self.params`.
    pub(crate) fn count_query(&self, table: &TableRef) -> String {
        format!("SELECT COUNT(*) AS total FROM {}{}", table, self.where_clause)
    }
}
