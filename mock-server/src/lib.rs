//! In-memory stand-in for the Mixpanel ingestion endpoints.
//!
//! `/track/` and `/engage/` decode the base64 `data` query parameter, check the
//! envelope the way Mixpanel does (project token, required keys, one profile
//! operation) and answer `1` or `0`. Accepted payloads are kept in memory and
//! exposed on `/recorded` so tests can inspect what actually went over the
//! wire.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const ACCEPTED: &str = "1";
pub const REJECTED: &str = "0";

const PROFILE_OPERATIONS: [&str; 7] = [
    "$set",
    "$set_once",
    "$add",
    "$append",
    "$union",
    "$unset",
    "$delete",
];

/// A payload accepted by one of the ingestion endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recorded {
    pub endpoint: String,
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct DataQuery {
    pub data: Option<String>,
}

pub type Db = Arc<RwLock<Vec<Recorded>>>;

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    recorded: Db,
}

/// Router accepting only payloads carrying `token`.
pub fn app(token: &str) -> Router {
    let state = AppState {
        token: Arc::from(token),
        recorded: Arc::new(RwLock::new(Vec::new())),
    };
    Router::new()
        .route("/track/", get(track))
        .route("/engage/", get(engage))
        .route("/recorded", get(list_recorded).delete(clear_recorded))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

async fn track(State(state): State<AppState>, Query(query): Query<DataQuery>) -> &'static str {
    let result = decode_data(query.data.as_deref())
        .and_then(|payload| validate_track(&payload, &state.token).map(|()| payload));
    record(&state, "track", result).await
}

async fn engage(State(state): State<AppState>, Query(query): Query<DataQuery>) -> &'static str {
    let result = decode_data(query.data.as_deref())
        .and_then(|payload| validate_engage(&payload, &state.token).map(|()| payload));
    record(&state, "engage", result).await
}

async fn record(state: &AppState, endpoint: &str, result: Result<Value, String>) -> &'static str {
    match result {
        Ok(payload) => {
            tracing::debug!(endpoint, "accepted payload");
            state.recorded.write().await.push(Recorded {
                endpoint: endpoint.to_string(),
                payload,
            });
            ACCEPTED
        }
        Err(reason) => {
            tracing::info!(endpoint, %reason, "rejected payload");
            REJECTED
        }
    }
}

async fn list_recorded(State(state): State<AppState>) -> Json<Vec<Recorded>> {
    Json(state.recorded.read().await.clone())
}

async fn clear_recorded(State(state): State<AppState>) -> StatusCode {
    state.recorded.write().await.clear();
    StatusCode::NO_CONTENT
}

/// base64 -> JSON object.
fn decode_data(data: Option<&str>) -> Result<Value, String> {
    let data = data.ok_or("missing data parameter")?;
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| format!("base64 decoding error: {e}"))?;
    let payload: Value = serde_json::from_slice(&bytes).map_err(|e| format!("invalid json: {e}"))?;
    if !payload.is_object() {
        return Err("payload is not an object".to_string());
    }
    Ok(payload)
}

fn validate_track(payload: &Value, token: &str) -> Result<(), String> {
    match payload.get("event").and_then(Value::as_str) {
        Some(event) if !event.is_empty() => {}
        _ => return Err("missing event name".to_string()),
    }
    let properties = payload
        .get("properties")
        .and_then(Value::as_object)
        .ok_or("missing properties")?;
    check_token(properties.get("token"), token)
}

fn validate_engage(payload: &Value, token: &str) -> Result<(), String> {
    let envelope: &Map<String, Value> = payload.as_object().ok_or("payload is not an object")?;
    check_token(envelope.get("$token"), token)?;
    if !envelope.get("$distinct_id").is_some_and(Value::is_string) {
        return Err("missing $distinct_id".to_string());
    }
    if envelope.get("$ip").is_some_and(|ip| !ip.is_string()) {
        return Err("$ip must be a string".to_string());
    }
    let operations = PROFILE_OPERATIONS
        .iter()
        .filter(|op| envelope.contains_key(**op))
        .count();
    if operations != 1 {
        return Err(format!("expected one profile operation, found {operations}"));
    }
    Ok(())
}

fn check_token(found: Option<&Value>, token: &str) -> Result<(), String> {
    match found.and_then(Value::as_str) {
        Some(t) if t == token => Ok(()),
        Some(_) => Err("token mismatch".to_string()),
        None => Err("missing token".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_track_requires_token() {
        let payload = json!({"event": "e", "properties": {"token": "tok"}});
        assert!(validate_track(&payload, "tok").is_ok());
        assert!(validate_track(&payload, "other").is_err());
        assert!(validate_track(&json!({"event": "e", "properties": {}}), "tok").is_err());
        assert!(validate_track(&json!({"properties": {"token": "tok"}}), "tok").is_err());
    }

    #[test]
    fn validate_engage_requires_single_operation() {
        let ok = json!({"$token": "tok", "$distinct_id": "1", "$delete": ""});
        assert!(validate_engage(&ok, "tok").is_ok());

        let none = json!({"$token": "tok", "$distinct_id": "1"});
        assert!(validate_engage(&none, "tok").is_err());

        let two = json!({"$token": "tok", "$distinct_id": "1", "$set": {}, "$unset": []});
        assert!(validate_engage(&two, "tok").is_err());
    }

    #[test]
    fn decode_data_rejects_garbage() {
        assert!(decode_data(None).is_err());
        assert!(decode_data(Some("not base64!")).is_err());
        assert!(decode_data(Some(&STANDARD.encode("[1,2]"))).is_err());
        assert!(decode_data(Some(&STANDARD.encode("{}"))).is_ok());
    }
}
