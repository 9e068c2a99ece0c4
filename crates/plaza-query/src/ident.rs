//! SQL identifiers that can only come from an introspected table.
//!
//! Postgres cannot bind identifiers as parameters, so table and column names
//! end up in statement text. [`TableRef`] and [`ColumnRef`] have no public
//! constructors: the only way to obtain one is to look a name up in a
//! [`TableDescriptor`](crate::catalog::TableDescriptor), which makes it
//! impossible to build a statement around an unvalidated name.

use std::fmt;

/// Double-quote an identifier, doubling any embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Normalizes a requested name for lenient matching: trimmed, lowercase.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A schema-qualified table known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    schema: String,
    name: String,
}

impl TableRef {
    pub(crate) fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

/// A column known to exist on a described table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    name: String,
    udt_name: String,
}

impl ColumnRef {
    pub(crate) fn new(name: &str, udt_name: &str) -> Self {
        Self {
            name: name.to_string(),
            udt_name: udt_name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholder `$n` cast to this column's type, so a text-bound value
    /// compares against integer, numeric, date or uuid columns alike.
    pub fn typed_param(&self, n: usize) -> String {
        format!("${}::{}", n, quote_ident(&self.udt_name))
    }

    /// The column as a calendar date. `date` columns are used as-is; any
    /// other type (timestamps, ISO text) is cast so whole-day comparisons
    /// include every time on the boundary days.
    pub fn as_date(&self) -> String {
        if self.udt_name == "date" {
            quote_ident(&self.name)
        } else {
            format!("{}::date", quote_ident(&self.name))
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_ident(&self.name))
    }
}
