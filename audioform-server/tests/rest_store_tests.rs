//! Integration tests for the hosted table store
//!
//! Runs `RestStore` against a local axum server that mimics the table
//! endpoint: header checks, `Prefer: return=representation`, and ordering.

use audioform_server::store::{NewSubmission, RestStore, StoreError, StoredSubmission, SubmissionStore};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const API_KEY: &str = "test-key";
const TABLE: &str = "audio_form_responses";

#[derive(Clone, Default)]
struct MockTable {
    rows: Arc<Mutex<Vec<StoredSubmission>>>,
    last_query: Arc<Mutex<HashMap<String, String>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(API_KEY) && bearer == Some("Bearer test-key")
}

async fn insert_rows(
    State(table): State<MockTable>,
    headers: HeaderMap,
    Json(records): Json<Vec<NewSubmission>>,
) -> Result<(StatusCode, Json<Vec<StoredSubmission>>), (StatusCode, Json<Value>)> {
    if !authorized(&headers) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid API key" })),
        ));
    }
    if headers.get("prefer").and_then(|v| v.to_str().ok()) != Some("return=representation") {
        return Ok((StatusCode::CREATED, Json(Vec::new())));
    }

    let mut rows = table.rows.lock().unwrap();
    let mut created = Vec::new();
    for record in records {
        let id = rows.len() as i64 + 1;
        let created_at = Utc.with_ymd_and_hms(2025, 1, 15, 3, 18, 0).unwrap()
            + chrono::Duration::seconds(id);
        let stored = StoredSubmission::from_new(id, created_at, record);
        rows.push(stored.clone());
        created.push(stored);
    }
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_rows(
    State(table): State<MockTable>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<StoredSubmission>>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    *table.last_query.lock().unwrap() = query;
    let mut rows = table.rows.lock().unwrap().clone();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(rows))
}

/// Start the mock table server, returning its base URL
async fn start_mock() -> (String, MockTable) {
    let table = MockTable::default();
    let app = Router::new()
        .route(
            &format!("/rest/v1/{}", TABLE),
            post(insert_rows).get(list_rows),
        )
        .with_state(table.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), table)
}

fn record(company: &str, employment_status: bool) -> NewSubmission {
    let start = Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap();
    NewSubmission {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        dob: Some("2001-02-03".to_string()),
        company: company.to_string(),
        employment_status,
        intro_audio_played: true,
        employment_audio_played: true,
        total_audio_listen_time_seconds: 38,
        intro_audio_completion_time: Some(start + chrono::Duration::seconds(20)),
        employment_audio_completion_time: Some(start + chrono::Duration::seconds(45)),
        form_start_time: start,
        form_completion_time: start + chrono::Duration::seconds(62),
        form_completion_time_seconds: 62,
    }
}

#[tokio::test]
async fn test_insert_returns_server_assigned_fields() {
    let (base, table) = start_mock().await;
    let store = RestStore::new(&base, Some(API_KEY.to_string()), TABLE).unwrap();

    let stored = store.insert(&record("HCS", true)).await.unwrap();
    assert_eq!(stored.id, 1);
    assert_eq!(stored.company, "HCS");
    assert_eq!(stored.dob.as_deref(), Some("2001-02-03"));
    assert_eq!(stored.total_audio_listen_time_seconds, 38);
    assert_eq!(table.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_all_requests_newest_first() {
    let (base, table) = start_mock().await;
    let store = RestStore::new(&base, Some(API_KEY.to_string()), TABLE).unwrap();

    store.insert(&record("A", true)).await.unwrap();
    store.insert(&record("B", false)).await.unwrap();

    let rows = store.list_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].company, "B");

    let query = table.last_query.lock().unwrap().clone();
    assert_eq!(query.get("select").map(String::as_str), Some("*"));
    assert_eq!(query.get("order").map(String::as_str), Some("created_at.desc"));
}

#[tokio::test]
async fn test_rejected_request_maps_to_store_error() {
    let (base, table) = start_mock().await;
    let store = RestStore::new(&base, Some("wrong".to_string()), TABLE).unwrap();

    let err = store.insert(&record("HCS", true)).await.unwrap_err();
    match err {
        StoreError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(table.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_http_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = RestStore::new(&format!("http://{}", addr), None, TABLE).unwrap();
    let err = store.list_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Http(_)));
}
