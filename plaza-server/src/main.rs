//! Plaza Server - REST API over the operational plaza tables

mod clients;
mod config;
mod health;
mod metrics;
mod routes;
mod settings;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use chrono::FixedOffset;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use metrics::ServerMetrics;
use plaza_query::{PolicyRegistry, QueryEngine, ReadFacade, SchemaCatalog};
use plaza_store::{PgStore, Store};

/// Application state shared across handlers
pub struct AppState {
    pub facade: ReadFacade,
    /// Direct store access for the fixed client and settings statements.
    pub store: Arc<dyn Store>,
    pub metrics: ServerMetrics,
    pub client_offset: FixedOffset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let policies = PolicyRegistry::load(&config.table_policy_path)
        .with_context(|| format!("Failed to load table policies from {}", config.table_policy_path))?;
    info!(
        "Loaded {} table policies from {}",
        policies.len(),
        config.table_policy_path
    );

    let store = Arc::new(
        PgStore::open(&config.database_url, &config.store_options())
            .await
            .context("Failed to connect to database")?,
    );
    let now = store.ping().await.context("Database ping failed")?;
    info!("Database connected at {}", now);

    let catalog = Arc::new(SchemaCatalog::new(
        store.clone(),
        policies,
        config.catalog_options(),
    ));
    catalog
        .validate_policies()
        .await
        .context("Table policy does not match the database schema")?;

    let engine = Arc::new(QueryEngine::new(catalog, config.engine_options()));
    let state = Arc::new(AppState {
        facade: ReadFacade::new(engine),
        store: store.clone(),
        metrics: ServerMetrics::new(),
        client_offset: config.client_utc_offset,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Starting plaza server on {}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    Ok(())
}

/// Build the full router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/api/tables/:table", get(routes::describe_table))
        .route("/api/tables/:table/data", get(routes::read_table))
        .route("/api/tables/:table/filter", get(routes::read_filtered))
        .route("/api/tables/:table/counts", get(routes::count_by))
        .route("/api/clients/status", get(clients::status))
        .route("/api/clients/status/:plaza", get(clients::status_by_plaza))
        .route("/api/clients/city/:city", get(clients::by_city))
        .route(
            "/api/clients/:client_id/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
