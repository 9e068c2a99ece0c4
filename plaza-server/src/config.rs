//! Server configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use plaza_query::{CatalogOptions, EngineOptions};
use plaza_store::PgStoreOptions;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: String,
    // Pool
    pub db_pool_max: u32,
    pub db_idle_timeout_ms: u64,
    pub db_connection_timeout_ms: u64,
    /// Schema the operational tables live in.
    pub db_schema: String,
    /// JSON file with per-table date policies.
    pub table_policy_path: String,
    /// Seconds a table descriptor is reused. 0 disables caching.
    pub schema_cache_ttl_secs: u64,
    pub max_page_size: u32,
    pub partition_column: String,
    pub hidden_column_prefix: String,
    /// Offset client timestamps are reported in.
    pub client_utc_offset: FixedOffset,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
            db_pool_max: std::env::var("DB_POOL_MAX")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Invalid DB_POOL_MAX")?,
            db_idle_timeout_ms: std::env::var("DB_IDLE_TIMEOUT")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .context("Invalid DB_IDLE_TIMEOUT")?,
            db_connection_timeout_ms: std::env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .context("Invalid DB_CONNECTION_TIMEOUT")?,
            db_schema: std::env::var("DB_SCHEMA").unwrap_or_else(|_| "public".to_string()),
            table_policy_path: std::env::var("TABLE_POLICY_PATH")
                .unwrap_or_else(|_| "config/tables.json".to_string()),
            schema_cache_ttl_secs: std::env::var("SCHEMA_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid SCHEMA_CACHE_TTL_SECS")?,
            max_page_size: std::env::var("MAX_PAGE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid MAX_PAGE_SIZE")?,
            partition_column: std::env::var("PARTITION_COLUMN")
                .unwrap_or_else(|_| "plaza".to_string()),
            hidden_column_prefix: std::env::var("HIDDEN_COLUMN_PREFIX")
                .unwrap_or_else(|_| "__".to_string()),
            client_utc_offset: std::env::var("CLIENT_UTC_OFFSET")
                .unwrap_or_else(|_| "-06:00".to_string())
                .parse()
                .context("Invalid CLIENT_UTC_OFFSET")?,
        })
    }

    pub fn store_options(&self) -> PgStoreOptions {
        PgStoreOptions {
            max_connections: self.db_pool_max,
            idle_timeout: Duration::from_millis(self.db_idle_timeout_ms),
            acquire_timeout: Duration::from_millis(self.db_connection_timeout_ms),
        }
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            schema: self.db_schema.clone(),
            hidden_prefix: self.hidden_column_prefix.clone(),
            cache_ttl: Duration::from_secs(self.schema_cache_ttl_secs),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            partition_column: self.partition_column.clone(),
            max_page_size: self.max_page_size,
        }
    }
}
