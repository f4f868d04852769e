//! Integration tests for the HTTP activity client and the wizard store
//!
//! Each test starts an in-process mock of the activity API on an ephemeral
//! port and drives `HttpActivityApi` (and a file-backed `WizardStore`)
//! against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use event_wizard::api::{ActivityApi, ApiError, CreateActivityRequest, HttpActivityApi};
use event_wizard::wizard::{FileStorage, StepKey, WizardError, WizardStore};
use event_wizard::Organization;

// ─── Mock server ──────────────────────────────────────────────────────────────

const TOKEN: &str = "secret";
/// Fetching this id answers 429
const RATE_LIMITED_ID: i64 = 429;

#[derive(Default)]
struct MockState {
    next_id: i64,
    activities: HashMap<i64, Value>,
    published: Vec<i64>,
}

type Shared = Arc<Mutex<MockState>>;

async fn create_activity(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let organization_id = body["organizationId"].as_i64().unwrap_or(0);
    if organization_id <= 0 {
        // error-shaped success, as the backend does for validation failures
        return Json(json!({
            "data": null,
            "error": {"code": "ORG_REQUIRED", "message": "organization is required"}
        }));
    }

    let mut state = state.lock().unwrap();
    state.next_id += 1;
    let id = state.next_id;
    state.activities.insert(
        id,
        json!({
            "id": id,
            "isOnline": body["isOnline"],
            "livestreamUrl": body.get("livestreamUrl").cloned().unwrap_or(Value::Null),
            "title": "Rust Meetup",
            "tags": ["rust"],
            "ticketTypes": [{"id": 1, "name": "General", "price": 1500, "quantity": 40}]
        }),
    );
    Json(json!({"data": {"id": id}}))
}

async fn get_activity(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    if id == RATE_LIMITED_ID {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "3")],
            Json(json!({"error": {"message": "slow down"}})),
        )
            .into_response();
    }

    match state.lock().unwrap().activities.get(&id) {
        Some(activity) => Json(json!({"data": activity})).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "activity not found"}})),
        )
            .into_response(),
    }
}

async fn publish_activity(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "login required"}})),
        )
            .into_response();
    }

    let mut state = state.lock().unwrap();
    if !state.activities.contains_key(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.published.push(id);
    Json(json!({"data": {"id": id, "published": true}})).into_response()
}

/// Start the mock API, returning its base URL and shared state
async fn start_mock() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockState::default()));
    let app = Router::new()
        .route("/api/activities", post(create_activity))
        .route("/api/activities/:id", get(get_activity))
        .route("/api/activities/:id/publish", post(publish_activity))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), state)
}

fn client(base_url: &str, token: Option<&str>) -> HttpActivityApi {
    HttpActivityApi::new(
        base_url,
        token.map(str::to_string),
        Duration::from_secs(5),
        "event-wizard-tests",
    )
    .unwrap()
}

fn acme() -> Organization {
    Organization {
        id: 1,
        name: "Acme".to_string(),
    }
}

// ─── Client tests ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_and_fetch_activity() {
    let (base_url, _) = start_mock().await;
    let api = client(&base_url, None);

    let created = api
        .create_activity(&CreateActivityRequest {
            organization_id: 1,
            is_online: true,
            livestream_url: Some("https://live.example.com/acme".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(created.id, 1);

    let snapshot = api.get_activity(created.id).await.unwrap();
    assert_eq!(snapshot.id, 1);
    assert!(snapshot.is_online);
    assert_eq!(
        snapshot.livestream_url.as_deref(),
        Some("https://live.example.com/acme")
    );
    assert_eq!(snapshot.ticket_types.len(), 1);
}

#[tokio::test]
async fn test_error_envelope_on_success_status() {
    let (base_url, _) = start_mock().await;
    let api = client(&base_url, None);

    let err = api
        .create_activity(&CreateActivityRequest {
            organization_id: 0,
            is_online: false,
            livestream_url: None,
        })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::rejected(
            "create_activity",
            Some("ORG_REQUIRED".to_string()),
            "organization is required"
        )
    );
}

#[tokio::test]
async fn test_status_mapping() {
    let (base_url, _) = start_mock().await;
    let api = client(&base_url, None);

    let err = api.get_activity(77).await.unwrap_err();
    assert!(err.is_not_found());

    let err = api.get_activity(RATE_LIMITED_ID).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), Some(3));

    let err = api.publish_activity(1).await.unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{addr}/api"), None);
    let err = api.get_activity(1).await.unwrap_err();
    assert!(matches!(err, ApiError::NetworkError { .. }));
}

// ─── Store over HTTP and file storage ─────────────────────────────────────────

#[tokio::test]
async fn test_full_wizard_flow() {
    let (base_url, state) = start_mock().await;
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path().join("create-event.json"));
    let cancel = CancellationToken::new();

    let mut store = WizardStore::open(client(&base_url, Some(TOKEN)), storage.clone()).unwrap();
    store.set_organization(acme()).unwrap();
    let id = store.create_event(false, None, &cancel).await.unwrap();
    assert_eq!(id, 1);

    let snapshot = store.load_remote_snapshot(&cancel).await.unwrap();
    assert_eq!(snapshot.display_title(), "Rust Meetup");

    for step in &StepKey::ALL[1..] {
        assert!(store.guard().can_access_step(*step));
        store.mark_step_complete(*step, true).unwrap();
    }
    assert!(store.guard().can_publish());

    let published = store.publish_event(&cancel).await.unwrap();
    assert_eq!(published, 1);
    assert_eq!(state.lock().unwrap().published, vec![1]);
    assert_eq!(store.event_id(), None);
    assert!(!storage.path().exists());
}

#[tokio::test]
async fn test_resume_after_restart() {
    let (base_url, _) = start_mock().await;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("create-event.json");
    let cancel = CancellationToken::new();

    {
        let mut store =
            WizardStore::open(client(&base_url, None), FileStorage::new(&path)).unwrap();
        store.set_organization(acme()).unwrap();
        store.create_event(false, None, &cancel).await.unwrap();
        store.mark_step_complete(StepKey::Category, true).unwrap();
    }

    let mut store = WizardStore::open(client(&base_url, None), FileStorage::new(&path)).unwrap();
    assert_eq!(store.event_id(), Some(1));
    assert_eq!(store.organization(), Some(&acme()));
    assert_eq!(store.overall_progress_percent(), 40);
    assert_eq!(
        store.guard().next_incomplete_step_path(1),
        "/create-event/1/basic-info"
    );
    // snapshot is transient and fetched again
    assert!(store.snapshot().is_none());
    store.ensure_snapshot(&cancel).await.unwrap();
    assert!(store.snapshot().is_some());
}

#[tokio::test]
async fn test_missing_activity_clears_progress_on_disk() {
    let (base_url, _) = start_mock().await;
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path().join("create-event.json"));
    let cancel = CancellationToken::new();

    let mut store = WizardStore::open(client(&base_url, None), storage.clone()).unwrap();
    store.set_organization(acme()).unwrap();
    store.set_event_id(404).unwrap();
    store.mark_step_complete(StepKey::PlaceType, true).unwrap();
    assert!(storage.path().exists());

    let err = store.load_remote_snapshot(&cancel).await.unwrap_err();
    match err {
        WizardError::StaleEvent { event_id, source } => {
            assert_eq!(event_id, 404);
            assert!(source.is_not_found());
        }
        other => panic!("Expected StaleEvent, got {other:?}"),
    }
    assert_eq!(store.event_id(), None);
    assert!(!store.is_step_complete(StepKey::PlaceType));
    assert!(!storage.path().exists());
}

#[tokio::test]
async fn test_rejected_create_keeps_state() {
    let (base_url, _) = start_mock().await;
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path().join("create-event.json"));

    let mut store = WizardStore::open(client(&base_url, None), storage).unwrap();
    store
        .set_organization(Organization {
            id: 0,
            name: "Nobody".to_string(),
        })
        .unwrap();

    let err = store
        .create_event(false, None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::Api(ApiError::Rejected { .. })));
    assert_eq!(store.event_id(), None);
    assert!(store.error().unwrap().contains("organization is required"));
}
