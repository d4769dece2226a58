use super::*;
use crate::mock_backend::MockStore;
use crate::mock_backend::test_helpers::spawn_mock_backend;
use crate::participant::LiveStatus;

fn timeouts() -> ApiTimeouts {
    ApiTimeouts { request: Duration::from_secs(5), connect: Duration::from_secs(2) }
}

async fn client_for(store: MockStore) -> HttpMonitorApi {
    let base = spawn_mock_backend(store).await;
    HttpMonitorApi::new(&base, timeouts()).unwrap()
}

// =============================================================================
// construction
// =============================================================================

#[test]
fn base_url_drops_trailing_slashes() {
    let api = HttpMonitorApi::new("http://localhost:8080//", timeouts()).unwrap();
    assert_eq!(api.base_url(), "http://localhost:8080");
}

// =============================================================================
// round trips against the mock backend
// =============================================================================

#[tokio::test]
async fn fresh_backend_is_waiting_with_no_users() {
    let api = client_for(MockStore::new()).await;

    let status = api.status().await.unwrap();
    assert!(!status.is_active());
    assert_eq!(status.count, Some(0));
    assert!(status.video_id.is_none());
    assert!(api.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn switch_then_pull_produces_a_participant() {
    let store = MockStore::new();
    let api = client_for(store.clone()).await;

    api.switch_video("abc123").await.unwrap();
    api.pull().await.unwrap();

    let status = api.status().await.unwrap();
    assert!(status.is_active());
    assert_eq!(status.video_id.as_deref(), Some("abc123"));
    assert_eq!(status.count, Some(1));

    let users = api.users().await.unwrap();
    assert_eq!(users.len(), 1);
    let participant = users.into_iter().next().unwrap().into_participant();
    assert_eq!(participant.display_name, "User-1");
    assert_eq!(store.video_id().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn reset_returns_backend_to_waiting() {
    let store = MockStore::new();
    let api = client_for(store.clone()).await;

    api.switch_video("abc").await.unwrap();
    api.pull().await.unwrap();
    api.reset().await.unwrap();

    assert_eq!(store.status(), LiveStatus::Waiting);
    assert!(api.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn plain_label_entries_decode() {
    let store = MockStore::new();
    store.set_users(vec![UserEntry::Label("Alice".into())]);
    let api = client_for(store).await;

    let users = api.users().await.unwrap();
    let participant = users.into_iter().next().unwrap().into_participant();
    assert_eq!(participant.display_name, "Alice");
    assert_eq!(participant.comment_count, 0);
}

// =============================================================================
// failures
// =============================================================================

#[tokio::test]
async fn rejected_switch_is_a_status_error() {
    let api = client_for(MockStore::new()).await;

    let err = api.switch_video("").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    assert_eq!(err.error_code(), "E_API_STATUS");
    assert!(!err.retryable());
}

#[tokio::test]
async fn unreachable_backend_is_a_retryable_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpMonitorApi::new(&format!("http://{addr}"), timeouts()).unwrap();
    let err = api.status().await.unwrap_err();
    assert!(matches!(err, ApiError::Request { .. }));
    assert_eq!(err.error_code(), "E_API_REQUEST");
    assert!(err.retryable());
}

#[test]
fn server_errors_are_retryable() {
    let err = ApiError::Status { path: "/status".into(), status: 503 };
    assert!(err.retryable());
    let err = ApiError::Decode { path: "/users.json".into(), message: "eof".into() };
    assert!(!err.retryable());
    assert_eq!(err.error_code(), "E_API_DECODE");
}

// =============================================================================
// users body shapes
// =============================================================================

async fn serve_users_body(body: serde_json::Value) -> HttpMonitorApi {
    let app = axum::Router::new().route(
        "/users.json",
        axum::routing::get(move || {
            let body = body.clone();
            async move { axum::Json(body) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    HttpMonitorApi::new(&format!("http://{addr}"), timeouts()).unwrap()
}

#[tokio::test]
async fn null_users_body_is_an_empty_list() {
    let api = serve_users_body(serde_json::Value::Null).await;
    assert_eq!(api.users().await.unwrap(), Vec::<UserEntry>::new());
}

#[tokio::test]
async fn non_array_users_body_is_an_empty_list() {
    let api = serve_users_body(serde_json::json!({ "users": ["Alice"] })).await;
    assert!(api.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_users_array_is_a_decode_error() {
    let api = serve_users_body(serde_json::json!([42])).await;
    let err = api.users().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}
