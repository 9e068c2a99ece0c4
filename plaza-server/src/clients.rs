//! Client activity and client listing endpoints.
//!
//! These run fixed statements against known tables; no caller text is
//! interpolated, so they go straight to the store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use plaza_store::{Row, SqlValue};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::routes::{rejected, store_failure};
use crate::AppState;

const STATUS_SQL: &str = "SELECT client_id, last_seen FROM client_activity \
     ORDER BY last_seen DESC LIMIT 1000";

const STATUS_BY_PLAZA_SQL: &str = "SELECT client_id, last_seen FROM client_activity \
     WHERE split_part(client_id, '_', 1) = $1 \
     ORDER BY last_seen DESC LIMIT 1000";

const CLIENTS_BY_CITY_SQL: &str = "SELECT client_id, tienda, tipo FROM spots \
     WHERE plaza = $1 AND is_active = true \
     ORDER BY tienda ASC LIMIT 200";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStatus {
    pub client_id: String,
    pub city: Option<String>,
    pub location: Option<String>,
    pub last_seen: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientStatusList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plaza: Option<String>,
    pub data: Vec<ClientStatus>,
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
}

#[derive(Debug, Serialize)]
pub struct CityClients {
    pub plaza: String,
    pub data: Vec<Row>,
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
}

/// Split `XAL_001` into city `XAL` and location `001`. Empty segments are `None`.
pub fn split_client_id(client_id: &str) -> (Option<String>, Option<String>) {
    let mut parts = client_id
        .split('_')
        .map(|p| (!p.is_empty()).then(|| p.to_string()));
    (parts.next().flatten(), parts.next().flatten())
}

/// Re-express a stored timestamp in `offset`.
///
/// `timestamptz` values arrive as RFC 3339; plain `timestamp` values are
/// taken to be UTC. Anything unparseable is passed through unchanged.
pub fn localize(value: &Value, offset: FixedOffset) -> Option<String> {
    let text = value.as_str()?;
    let utc = DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc())
        });
    match utc {
        Ok(utc) => Some(utc.with_timezone(&offset).to_rfc3339()),
        Err(_) => Some(text.to_string()),
    }
}

fn to_status(row: &Row, offset: FixedOffset) -> ClientStatus {
    let client_id = row
        .get("client_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let (city, location) = split_client_id(&client_id);
    ClientStatus {
        city,
        location,
        last_seen: row.get("last_seen").and_then(|v| localize(v, offset)),
        client_id,
    }
}

async fn load_status(
    state: &AppState,
    endpoint: &'static str,
    plaza: Option<String>,
) -> Result<Json<ClientStatusList>, (StatusCode, String)> {
    let output = match &plaza {
        Some(p) => {
            state
                .store
                .execute(STATUS_BY_PLAZA_SQL, &[SqlValue::from(p.as_str())])
                .await
        }
        None => state.store.execute(STATUS_SQL, &[]).await,
    }
    .map_err(|e| store_failure(state, endpoint, e))?;

    info!("Client activity rows: {}", output.rows.len());
    if output.rows.is_empty() {
        return Err(rejected(
            state,
            endpoint,
            StatusCode::NOT_FOUND,
            "No client activity found".to_string(),
        ));
    }

    let data: Vec<ClientStatus> = output
        .rows
        .iter()
        .map(|row| to_status(row, state.client_offset))
        .collect();
    state.metrics.record_rows(endpoint, data.len());

    Ok(Json(ClientStatusList {
        plaza,
        total_records: data.len(),
        data,
    }))
}

/// GET /api/clients/status
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClientStatusList>, (StatusCode, String)> {
    load_status(&state, "client_status", None).await
}

/// GET /api/clients/status/:plaza
pub async fn status_by_plaza(
    State(state): State<Arc<AppState>>,
    Path(plaza): Path<String>,
) -> Result<Json<ClientStatusList>, (StatusCode, String)> {
    load_status(&state, "client_status", Some(plaza)).await
}

/// GET /api/clients/city/:city
pub async fn by_city(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<Json<CityClients>, (StatusCode, String)> {
    const ENDPOINT: &str = "clients_by_city";

    let city = city.trim().to_string();
    if city.is_empty() {
        return Err(rejected(
            &state,
            ENDPOINT,
            StatusCode::BAD_REQUEST,
            "City parameter is required".to_string(),
        ));
    }

    let output = state
        .store
        .execute(CLIENTS_BY_CITY_SQL, &[SqlValue::from(city.as_str())])
        .await
        .map_err(|e| store_failure(&state, ENDPOINT, e))?;

    if output.rows.is_empty() {
        return Err(rejected(
            &state,
            ENDPOINT,
            StatusCode::NOT_FOUND,
            format!("No clients found for city '{}'", city),
        ));
    }

    state.metrics.record_rows(ENDPOINT, output.rows.len());
    Ok(Json(CityClients {
        plaza: city,
        total_records: output.rows.len(),
        data: output.rows,
    }))
}
