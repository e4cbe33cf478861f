use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate;
use crate::models::{FriendTotal, SessionRecord};
use crate::storage::{EntityType, JsonlReader, JsonlWriter};

/// Payload for creating one session record.
#[derive(Debug, Deserialize)]
pub struct RecordCreate {
    pub date: NaiveDate,
    pub location: String,
    pub number: f64,
    #[serde(default)]
    pub friend_names: Vec<String>,
    pub pint_brand: Option<String>,
    pub pint_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub comment: Option<String>,
}

/// Response for a created record: the stored record's identity plus the
/// updated running totals for every affected friend.
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub id: String,
    pub date: NaiveDate,
    pub location: String,
    pub friend_names: Vec<String>,
    pub number: f64,
    pub pint_brand: Option<String>,
    pub pint_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub comment: Option<String>,
    pub friend_totals: Vec<FriendTotal>,
}

/// GET /api/records
pub async fn list_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let reader = JsonlReader::<SessionRecord>::for_entity(&state.storage, EntityType::Record);
    let records = reader.read_all()?;
    Ok(Json(records))
}

/// POST /api/records
///
/// The live-append path: validates, stores the record, and bumps the
/// friend ledger under the write lock so a report never observes a
/// half-applied record.
pub async fn create_record(
    State(state): State<AppState>,
    Json(payload): Json<RecordCreate>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    let mut record = SessionRecord::new(
        payload.date,
        payload.location,
        payload.friend_names,
        payload.number,
    )
    .with_costs(payload.pint_cost, payload.total_cost);
    if let Some(brand) = payload.pint_brand {
        record = record.with_brand(brand);
    }
    if let Some(comment) = payload.comment {
        record = record.with_comment(comment);
    }

    calculate::validate(std::slice::from_ref(&record))?;

    let mut ledger = state.ledger.write().await;

    let writer = JsonlWriter::<SessionRecord>::for_entity(&state.storage, EntityType::Record);
    writer.append(&record)?;

    let friend_totals = ledger.apply(&record);

    let totals_writer =
        JsonlWriter::<FriendTotal>::for_entity(&state.storage, EntityType::FriendTotal);
    totals_writer.write_all(&ledger.entries())?;

    info!(
        "Created record {} at {} ({} pints, {} friends)",
        record.id,
        record.location,
        record.quantity,
        record.participants.len()
    );

    let response = RecordResponse {
        id: record.id.to_string(),
        date: record.date,
        location: record.location.clone(),
        friend_names: record.participants.clone(),
        number: record.quantity,
        pint_brand: record.brand.clone(),
        pint_cost: record.unit_cost,
        total_cost: record.effective_total_cost(),
        comment: record.comment.clone(),
        friend_totals,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;
    use crate::geocode::testing::MockGeocoder;
    use crate::ledger::FriendLedger;
    use crate::models::GeoSnapshot;
    use crate::storage::StorageConfig;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn setup_test_state(dir: &std::path::Path) -> AppState {
        AppState {
            storage: Arc::new(StorageConfig::new(dir.to_path_buf())),
            ledger: Arc::new(tokio::sync::RwLock::new(FriendLedger::new())),
            geo: Arc::new(tokio::sync::RwLock::new(GeoSnapshot::new())),
            geocoder: Arc::new(MockGeocoder::new()),
        }
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_create_record_returns_totals() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());
        let app = build_router(state, "*");

        let (status, body) = post_json(
            app,
            "/api/records",
            json!({
                "date": "2024-01-01",
                "location": "Pub A",
                "number": 4.0,
                "friend_names": ["Alice", "Bob"],
                "pint_brand": "Guinness",
                "pint_cost": 6.5
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["location"], "Pub A");
        assert_eq!(body["total_cost"], 26.0);
        assert_eq!(body["friend_totals"].as_array().unwrap().len(), 2);
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());

        let (status, _) = post_json(
            build_router(state.clone(), "*"),
            "/api/records",
            json!({
                "date": "2024-01-01",
                "location": "Pub A",
                "number": 2.0,
                "friend_names": ["Alice"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = get_json(build_router(state, "*"), "/api/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["location"], "Pub A");
    }

    #[tokio::test]
    async fn test_create_accumulates_ledger() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());

        post_json(
            build_router(state.clone(), "*"),
            "/api/records",
            json!({
                "date": "2024-01-01",
                "location": "Pub A",
                "number": 4.0,
                "friend_names": ["Alice", "Bob"]
            }),
        )
        .await;
        let (_, body) = post_json(
            build_router(state.clone(), "*"),
            "/api/records",
            json!({
                "date": "2024-01-02",
                "location": "Pub A",
                "number": 2.0,
                "friend_names": ["Alice"]
            }),
        )
        .await;

        let totals = body["friend_totals"].as_array().unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0]["name"], "Alice");
        assert_eq!(totals[0]["total_pints"], 6.0);

        let ledger = state.ledger.read().await;
        assert_eq!(ledger.total_for("Bob"), Some(4.0));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_record() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());

        let (status, body) = post_json(
            build_router(state.clone(), "*"),
            "/api/records",
            json!({
                "date": "2024-01-01",
                "location": "Pub A",
                "number": -1.0,
                "friend_names": []
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        // Nothing was stored.
        let reader =
            JsonlReader::<SessionRecord>::for_entity(&state.storage, EntityType::Record);
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());

        let (status, body) = get_json(build_router(state, "*"), "/api/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
