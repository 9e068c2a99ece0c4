//! Plaza Query - schema-aware paginated reads
//!
//! This crate turns a table name, an optional filter and a page request into
//! a validated, parameterized page query plus a matching count query against
//! a [`plaza_store::Store`]. Table and column names are checked against the
//! introspected schema before they are placed in SQL text.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod facade;
pub mod filter;
pub mod ident;
pub mod pagination;
pub mod policy;
pub mod predicate;

pub use catalog::{canonical_table_name, CatalogOptions, SchemaCatalog, TableDescriptor};
pub use engine::{EngineOptions, GroupCount, QueryEngine};
pub use error::{QueryError, ValidationError};
pub use facade::{FilteredRead, ReadFacade, TableMetadata, TableRead};
pub use filter::{DateRange, Filter};
pub use ident::{ColumnRef, TableRef};
pub use pagination::{PageBounds, PageRequest, PageResult, Pagination};
pub use policy::{PolicyError, PolicyRegistry, TablePolicy};
pub use predicate::Predicate;
