//! Schema catalog: table descriptors by introspection, policies by lookup.
//!
//! Descriptors are cached per table for a bounded time. A cached descriptor
//! is only ever a stale allowlist of columns that existed recently; every
//! identifier still goes through [`TableDescriptor::column`] before it is
//! placed in SQL text.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use plaza_store::{ColumnInfo, Store, StoreError};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::ident::{normalize_name, ColumnRef, TableRef};
use crate::policy::{PolicyError, PolicyRegistry, TablePolicy};

/// Canonical (introspection) form of a table name.
pub fn canonical_table_name(table: &str) -> String {
    table.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// TableDescriptor
// ---------------------------------------------------------------------------

/// Visible columns of one table, in ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescriptor {
    #[serde(skip)]
    schema: String,
    table: String,
    columns: Vec<ColumnInfo>,
}

impl TableDescriptor {
    pub(crate) fn new(schema: &str, table: &str, columns: Vec<ColumnInfo>) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// An empty descriptor means the table does not exist (or hides every column).
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The table as an SQL identifier. Fails for tables with no visible columns.
    pub fn table_ref(&self) -> Result<TableRef, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::UnknownTable(self.table.clone()));
        }
        Ok(TableRef::new(&self.schema, &self.table))
    }

    /// Resolve a requested column name against this table.
    ///
    /// Exact names win; otherwise a trimmed, case-insensitive match is
    /// accepted so `PLAZA` resolves to `plaza`.
    pub fn column(&self, requested: &str) -> Result<ColumnRef, ValidationError> {
        let found = self
            .columns
            .iter()
            .find(|c| c.name == requested)
            .or_else(|| {
                let wanted = normalize_name(requested);
                self.columns.iter().find(|c| normalize_name(&c.name) == wanted)
            });

        match found {
            Some(c) => Ok(ColumnRef::new(&c.name, &c.udt_name)),
            None => Err(ValidationError::UnknownField {
                table: self.table.clone(),
                field: requested.to_string(),
            }),
        }
    }

    pub fn has_column(&self, requested: &str) -> bool {
        self.column(requested).is_ok()
    }
}

// ---------------------------------------------------------------------------
// SchemaCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Database schema the tables live in.
    pub schema: String,
    /// Columns whose name starts with this prefix are private and never described.
    /// Empty disables hiding.
    pub hidden_prefix: String,
    /// How long a descriptor is reused. Zero disables caching.
    pub cache_ttl: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            hidden_prefix: "__".to_string(),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

struct CachedDescriptor {
    descriptor: TableDescriptor,
    fetched_at: Instant,
}

pub struct SchemaCatalog {
    store: Arc<dyn Store>,
    policies: PolicyRegistry,
    options: CatalogOptions,
    cache: RwLock<HashMap<String, CachedDescriptor>>,
}

impl SchemaCatalog {
    pub fn new(store: Arc<dyn Store>, policies: PolicyRegistry, options: CatalogOptions) -> Self {
        Self {
            store,
            policies,
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// Describe `table`. Unknown tables yield an empty descriptor, not an error.
    pub async fn describe(&self, table: &str) -> Result<TableDescriptor, StoreError> {
        let key = canonical_table_name(table);

        if let Some(descriptor) = self.cached(&key).await {
            debug!("Descriptor cache hit for '{}'", key);
            return Ok(descriptor);
        }

        let columns = self
            .store
            .introspect_columns(&self.options.schema, &key)
            .await?;
        let visible: Vec<ColumnInfo> = columns
            .into_iter()
            .filter(|c| !self.is_hidden(&c.name))
            .collect();
        let descriptor = TableDescriptor::new(&self.options.schema, &key, visible);

        debug!(
            "Described '{}.{}': {} visible columns",
            self.options.schema,
            key,
            descriptor.columns().len()
        );

        // Missing tables are not cached so a newly created table shows up at once.
        if !descriptor.is_empty() && !self.options.cache_ttl.is_zero() {
            self.cache.write().await.insert(
                key,
                CachedDescriptor {
                    descriptor: descriptor.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }

        Ok(descriptor)
    }

    /// Static policy for `table`.
    pub fn policy_for(&self, table: &str) -> TablePolicy {
        self.policies.policy_for(table)
    }

    /// Drop the cached descriptor for `table`.
    pub async fn invalidate(&self, table: &str) {
        self.cache.write().await.remove(&canonical_table_name(table));
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Check every configured date column against the live schema.
    ///
    /// Tables that do not exist yet are skipped with a warning; a table that
    /// exists without its configured date column is a configuration error.
    pub async fn validate_policies(&self) -> Result<(), PolicyError> {
        for (table, column) in self.policies.date_columns() {
            let descriptor = self
                .describe(table)
                .await
                .map_err(|source| PolicyError::Store {
                    table: table.to_string(),
                    source,
                })?;

            if descriptor.is_empty() {
                warn!(
                    "Table policy for '{}' refers to a table that does not exist yet",
                    table
                );
                continue;
            }

            if !descriptor.has_column(column) {
                return Err(PolicyError::DateColumnMissing {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }

        info!("Validated {} table policies", self.policies.len());
        Ok(())
    }

    fn is_hidden(&self, column: &str) -> bool {
        !self.options.hidden_prefix.is_empty() && column.starts_with(&self.options.hidden_prefix)
    }

    async fn cached(&self, key: &str) -> Option<TableDescriptor> {
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.options.cache_ttl)
            .map(|entry| entry.descriptor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaza_store::MemoryStore;

    fn spots_columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("_client_id", "character varying", "varchar"),
            ColumnInfo::new("plaza", "character varying", "varchar"),
            ColumnInfo::new("__sync_token", "text", "text"),
            ColumnInfo::new("tienda", "text", "text"),
        ]
    }

    fn catalog_with(store: Arc<MemoryStore>, options: CatalogOptions) -> SchemaCatalog {
        SchemaCatalog::new(store, PolicyRegistry::new(), options)
    }

    #[tokio::test]
    async fn test_describe_lowercases_and_hides_private_columns() {
        let store = Arc::new(MemoryStore::new().with_table("public", "spots", spots_columns()));
        let catalog = catalog_with(store, CatalogOptions::default());

        let d = catalog.describe("SPOTS").await.unwrap();
        assert_eq!(d.table(), "spots");
        assert_eq!(d.column_names(), vec!["_client_id", "plaza", "tienda"]);
    }

    #[tokio::test]
    async fn test_empty_prefix_hides_nothing() {
        let store = Arc::new(MemoryStore::new().with_table("public", "spots", spots_columns()));
        let options = CatalogOptions {
            hidden_prefix: String::new(),
            ..Default::default()
        };
        let d = catalog_with(store, options).describe("spots").await.unwrap();
        assert_eq!(d.columns().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty_not_error() {
        let store = Arc::new(MemoryStore::new());
        let catalog = catalog_with(store, CatalogOptions::default());
        let d = catalog.describe("nope").await.unwrap();
        assert!(d.is_empty());
        assert!(matches!(d.table_ref(), Err(ValidationError::UnknownTable(_))));
        assert!(matches!(
            d.column("anything"),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[tokio::test]
    async fn test_descriptor_is_cached_within_ttl() {
        let store = Arc::new(MemoryStore::new().with_table("public", "spots", spots_columns()));
        let catalog = catalog_with(store.clone(), CatalogOptions::default());

        catalog.describe("spots").await.unwrap();
        catalog.describe("Spots").await.unwrap();
        assert_eq!(store.introspection_count(), 1);

        catalog.invalidate("SPOTS").await;
        catalog.describe("spots").await.unwrap();
        assert_eq!(store.introspection_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let store = Arc::new(MemoryStore::new().with_table("public", "spots", spots_columns()));
        let options = CatalogOptions {
            cache_ttl: Duration::ZERO,
            ..Default::default()
        };
        let catalog = catalog_with(store.clone(), options);

        catalog.describe("spots").await.unwrap();
        catalog.describe("spots").await.unwrap();
        assert_eq!(store.introspection_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_tables_are_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let catalog = catalog_with(store.clone(), CatalogOptions::default());

        catalog.describe("later").await.unwrap();
        catalog.describe("later").await.unwrap();
        assert_eq!(store.introspection_count(), 2);
    }

    #[test]
    fn test_column_resolution_exact_then_case_insensitive() {
        let d = TableDescriptor::new("public", "spots", spots_columns());
        assert_eq!(d.column("plaza").unwrap().name(), "plaza");
        assert_eq!(d.column("PLAZA").unwrap().name(), "plaza");
        assert_eq!(d.column("_client_id").unwrap().name(), "_client_id");
        assert!(d.column("client_id").is_err());
    }

    #[test]
    fn test_policy_for_passthrough() {
        let catalog = SchemaCatalog::new(
            Arc::new(MemoryStore::new()),
            PolicyRegistry::new().with_policy("cunota", TablePolicy::with_date_column("fecha")),
            CatalogOptions::default(),
        );
        assert!(catalog.policy_for("CUNOTA").has_date_column);
        assert!(!catalog.policy_for("CLIENTE").has_date_column);
    }

    #[tokio::test]
    async fn test_validate_policies_reports_missing_date_column() {
        let store = Arc::new(MemoryStore::new().with_table(
            "public",
            "cunota",
            vec![ColumnInfo::new("plaza", "character varying", "varchar")],
        ));
        let catalog = SchemaCatalog::new(
            store,
            PolicyRegistry::new().with_policy("CUNOTA", TablePolicy::with_date_column("fecha")),
            CatalogOptions::default(),
        );

        let err = catalog.validate_policies().await.unwrap_err();
        assert!(matches!(
            err,
            PolicyError::DateColumnMissing { ref table, ref column } if table == "CUNOTA" && column == "fecha"
        ));
    }

    #[tokio::test]
    async fn test_validate_policies_accepts_existing_column_and_missing_table() {
        let store = Arc::new(MemoryStore::new().with_table(
            "public",
            "cunota",
            vec![
                ColumnInfo::new("fecha", "date", "date"),
                ColumnInfo::new("plaza", "character varying", "varchar"),
            ],
        ));
        let catalog = SchemaCatalog::new(
            store,
            PolicyRegistry::new()
                .with_policy("CUNOTA", TablePolicy::with_date_column("fecha"))
                .with_policy("FUTURE", TablePolicy::with_date_column("creado")),
            CatalogOptions::default(),
        );

        assert!(catalog.validate_policies().await.is_ok());
    }
}
