//! Per-client settings: read all, update many.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use plaza_store::{Row, SqlValue};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::routes::{rejected, store_failure};
use crate::AppState;

const SETTINGS_SQL: &str = "SELECT key, value FROM spot_settings \
     WHERE client_id = $1 ORDER BY key ASC";

const UPDATE_SETTING_SQL: &str = "UPDATE spot_settings \
     SET value = $1, updated_at = CURRENT_TIMESTAMP \
     WHERE client_id = $2 AND key = $3";

#[derive(Debug, Serialize)]
pub struct ClientSettings {
    pub client_id: String,
    pub data: Vec<Row>,
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
}

#[derive(Debug, Deserialize)]
pub struct SettingUpdate {
    #[serde(default)]
    pub key: Option<String>,
    /// `None` only when the field is absent; an explicit `null` is `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub settings: Vec<SettingUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingOutcome {
    pub key: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_updated: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub total_updated: u64,
    pub results: Vec<SettingOutcome>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSettingsResponse {
    pub success: bool,
    pub message: String,
    pub data: UpdateSummary,
}

/// Settings are stored as text; non-string JSON values keep their JSON
/// spelling and `null` clears the value.
fn setting_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// GET /api/clients/:client_id/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientSettings>, (StatusCode, String)> {
    const ENDPOINT: &str = "client_settings";

    let output = state
        .store
        .execute(SETTINGS_SQL, &[SqlValue::from(client_id.as_str())])
        .await
        .map_err(|e| store_failure(&state, ENDPOINT, e))?;

    if output.rows.is_empty() {
        return Err(rejected(
            &state,
            ENDPOINT,
            StatusCode::NOT_FOUND,
            format!("No settings found for client '{}'", client_id),
        ));
    }

    state.metrics.record_rows(ENDPOINT, output.rows.len());
    Ok(Json(ClientSettings {
        client_id,
        total_records: output.rows.len(),
        data: output.rows,
    }))
}

/// PUT /api/clients/:client_id/settings
///
/// Entries are applied one after another; a bad entry is reported and
/// skipped. The request succeeds when at least one row changed.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<(StatusCode, Json<UpdateSettingsResponse>), (StatusCode, String)> {
    const ENDPOINT: &str = "client_settings_update";

    if req.settings.is_empty() {
        return Err(rejected(
            &state,
            ENDPOINT,
            StatusCode::BAD_REQUEST,
            "settings must be a non-empty array of {key, value} objects".to_string(),
        ));
    }

    let mut total_updated = 0u64;
    let mut results = Vec::with_capacity(req.settings.len());

    for setting in &req.settings {
        let key = setting.key.as_deref().filter(|k| !k.is_empty());
        let (key, value) = match (key, &setting.value) {
            (Some(key), Some(value)) => (key, value),
            (key, _) => {
                results.push(SettingOutcome {
                    key: key.unwrap_or("unknown").to_string(),
                    success: false,
                    rows_updated: None,
                    message: Some("Missing key or value".to_string()),
                });
                continue;
            }
        };

        let output = state
            .store
            .execute(
                UPDATE_SETTING_SQL,
                &[
                    setting_value(value),
                    SqlValue::from(client_id.as_str()),
                    SqlValue::from(key),
                ],
            )
            .await
            .map_err(|e| store_failure(&state, ENDPOINT, e))?;

        if output.row_count > 0 {
            total_updated += output.row_count;
            results.push(SettingOutcome {
                key: key.to_string(),
                success: true,
                rows_updated: Some(output.row_count),
                message: None,
            });
        } else {
            results.push(SettingOutcome {
                key: key.to_string(),
                success: false,
                rows_updated: None,
                message: Some("No matching setting found".to_string()),
            });
        }
    }

    info!(
        "Client '{}' settings update: {} rows updated",
        client_id, total_updated
    );
    state.metrics.settings_updated.inc_by(total_updated);

    let success = total_updated > 0;
    let (status, message) = if success {
        state.metrics.record(ENDPOINT, crate::metrics::OK);
        (
            StatusCode::OK,
            format!("Successfully updated {} setting(s)", total_updated),
        )
    } else {
        state.metrics.record(ENDPOINT, crate::metrics::INVALID);
        (StatusCode::NOT_FOUND, "No settings were updated".to_string())
    };

    Ok((
        status,
        Json(UpdateSettingsResponse {
            success,
            message,
            data: UpdateSummary {
                total_updated,
                results,
            },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_with;
    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use plaza_store::{MemoryStore, QueryOutput, StoreError};
    use serde_json::json;
    use tower::ServiceExt;

    /// Store where only `volume` and `brightness` exist for `XAL_001`.
    fn settings_store() -> MemoryStore {
        MemoryStore::new().with_responder(|sql, params| {
            if sql.starts_with("UPDATE") {
                let matched = matches!(
                    (&params[1], &params[2]),
                    (SqlValue::Text(c), SqlValue::Text(k))
                        if c == "XAL_001" && (k == "volume" || k == "brightness")
                );
                return Ok(QueryOutput::affected(u64::from(matched)));
            }
            match &params[0] {
                SqlValue::Text(c) if c == "XAL_001" => {
                    let rows = [("brightness", "80"), ("volume", "10")]
                        .into_iter()
                        .map(|(k, v)| {
                            let mut row = Row::new();
                            row.insert("key".to_string(), json!(k));
                            row.insert("value".to_string(), json!(v));
                            row
                        })
                        .collect();
                    Ok(QueryOutput::from_rows(rows))
                }
                _ => Ok(QueryOutput::default()),
            }
        })
    }

    async fn send(
        store: MemoryStore,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let app = crate::app(state_with(store));
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn setting_value_keeps_strings_bare() {
        assert_eq!(setting_value(&json!("on")), SqlValue::Text("on".to_string()));
        assert_eq!(setting_value(&json!(10)), SqlValue::Text("10".to_string()));
        assert_eq!(setting_value(&json!(true)), SqlValue::Text("true".to_string()));
        assert_eq!(setting_value(&Value::Null), SqlValue::Null);
    }

    #[test]
    fn null_value_is_distinct_from_missing() {
        let req: UpdateSettingsRequest = serde_json::from_value(json!({"settings": [
            {"key": "volume", "value": null},
            {"key": "volume"}
        ]}))
        .unwrap();
        assert_eq!(req.settings[0].value, Some(Value::Null));
        assert_eq!(req.settings[1].value, None);
    }

    #[tokio::test]
    async fn update_with_null_value_binds_null() {
        let store = MemoryStore::new().with_responder(|_, params| {
            Ok(QueryOutput::affected(u64::from(params[0] == SqlValue::Null)))
        });
        let (status, body) = send(
            store,
            "PUT",
            "/api/clients/XAL_001/settings",
            Some(json!({"settings": [{"key": "volume", "value": null}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["results"],
            json!([{"key": "volume", "success": true, "rowsUpdated": 1}])
        );
    }

    #[tokio::test]
    async fn get_settings_lists_keys() {
        let (status, body) =
            send(settings_store(), "GET", "/api/clients/XAL_001/settings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["client_id"], "XAL_001");
        assert_eq!(body["totalRecords"], 2);
        assert_eq!(body["data"][0], json!({"key": "brightness", "value": "80"}));
    }

    #[tokio::test]
    async fn get_settings_unknown_client_is_404() {
        let (status, _) =
            send(settings_store(), "GET", "/api/clients/NOPE/settings", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_reports_each_entry() {
        let body = json!({"settings": [
            {"key": "volume", "value": 25},
            {"key": "contrast", "value": "high"},
            {"value": "orphan"},
            {"key": "brightness"}
        ]});
        let (status, body) = send(
            settings_store(),
            "PUT",
            "/api/clients/XAL_001/settings",
            Some(body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["totalUpdated"], 1);
        assert_eq!(
            body["data"]["results"],
            json!([
                {"key": "volume", "success": true, "rowsUpdated": 1},
                {"key": "contrast", "success": false, "message": "No matching setting found"},
                {"key": "unknown", "success": false, "message": "Missing key or value"},
                {"key": "brightness", "success": false, "message": "Missing key or value"}
            ])
        );
    }

    #[tokio::test]
    async fn update_counts_every_matched_row() {
        let state = state_with(settings_store());
        let app = crate::app(state);
        let body = json!({"settings": [
            {"key": "volume", "value": "1"},
            {"key": "brightness", "value": "2"}
        ]});
        let resp = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/clients/XAL_001/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["totalUpdated"], 2);
        assert_eq!(body["message"], "Successfully updated 2 setting(s)");
    }

    #[tokio::test]
    async fn update_with_nothing_matched_is_404() {
        let body = json!({"settings": [{"key": "contrast", "value": "high"}]});
        let (status, body) = send(
            settings_store(),
            "PUT",
            "/api/clients/XAL_001/settings",
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No settings were updated");
    }

    #[tokio::test]
    async fn update_with_empty_list_is_400() {
        let (status, _) = send(
            settings_store(),
            "PUT",
            "/api/clients/XAL_001/settings",
            Some(json!({"settings": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_store_failure_is_500() {
        let store = MemoryStore::new()
            .with_responder(|_, _| Err(StoreError::QueryFailed("deadlock detected".to_string())));
        let (status, _) = send(
            store,
            "PUT",
            "/api/clients/XAL_001/settings",
            Some(json!({"settings": [{"key": "volume", "value": "1"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
