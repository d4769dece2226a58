//! In-process stand-in for the monitoring backend.
//!
//! DESIGN
//! ======
//! State lives in a `MockStore` handle that the caller constructs and passes
//! to [`router`]. Nothing is global: each test builds its own store, and
//! `reset` returns it to the initial WAITING / no-users state. The routes
//! mirror the real backend's surface closely enough for the dashboard and
//! HTTP client to be exercised end to end, and the `mock-server` command
//! serves them for local development.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::participant::{LiveStatus, Participant, UserEntry};

// =============================================================================
// STORE
// =============================================================================

/// Shared, resettable mock backend state. Clones share the same state.
#[derive(Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockState>>,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct MockState {
    status: LiveStatus,
    users: Vec<UserEntry>,
    video_id: Option<String>,
}

impl MockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { inner: Arc::new(Mutex::new(MockState::default())), clock }
    }

    /// Back to WAITING with no users and no video.
    pub fn reset(&self) {
        *self.lock() = MockState::default();
    }

    #[must_use]
    pub fn status(&self) -> LiveStatus {
        self.lock().status
    }

    pub fn set_status(&self, status: LiveStatus) {
        self.lock().status = status;
    }

    #[must_use]
    pub fn users(&self) -> Vec<UserEntry> {
        self.lock().users.clone()
    }

    pub fn set_users(&self, users: Vec<UserEntry>) {
        self.lock().users = users;
    }

    #[must_use]
    pub fn video_id(&self) -> Option<String> {
        self.lock().video_id.clone()
    }

    fn switch_video(&self, video_id: String) {
        let mut state = self.lock();
        state.status = LiveStatus::Active;
        state.users.clear();
        state.video_id = Some(video_id);
    }

    /// Append the next synthetic participant and return it.
    fn pull(&self) -> Participant {
        let now = self.clock.now().format(&Rfc3339).ok();
        let mut state = self.lock();
        let n = state.users.len() + 1;
        let participant = Participant {
            channel_id: format!("UCmock{n}"),
            display_name: format!("User-{n}"),
            joined_at: now.clone(),
            first_commented_at: now,
            comment_count: 1,
        };
        state.users.push(UserEntry::Record(participant.clone()));
        participant
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ROUTES
// =============================================================================

/// Assemble the mock backend router over `store`.
pub fn router(store: MockStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(status))
        .route("/users.json", get(users))
        .route("/switch-video", post(switch_video))
        .route("/pull", post(pull))
        .route("/reset", post(reset))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchVideoRequest {
    #[serde(default)]
    video_id: Option<String>,
}

/// `GET /status` — live status and user count.
async fn status(State(store): State<MockStore>) -> Json<serde_json::Value> {
    let state = store.lock();
    Json(serde_json::json!({
        "status": state.status.as_str(),
        "count": state.users.len(),
        "videoId": state.video_id.clone().unwrap_or_default(),
    }))
}

/// `GET /users.json` — stored entries as-is.
async fn users(State(store): State<MockStore>) -> Json<Vec<UserEntry>> {
    Json(store.users())
}

/// `POST /switch-video` — requires a JSON body with a non-empty `videoId`.
async fn switch_video(State(store): State<MockStore>, body: String) -> impl IntoResponse {
    let Ok(request) = serde_json::from_str::<SwitchVideoRequest>(&body) else {
        return (StatusCode::BAD_REQUEST, "bad request");
    };
    let Some(video_id) = request.video_id.filter(|id| !id.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "bad request");
    };

    info!(%video_id, "mock backend switched video");
    store.switch_video(video_id);
    (StatusCode::OK, "")
}

/// `POST /pull` — appends one synthetic participant.
async fn pull(State(store): State<MockStore>) -> StatusCode {
    let participant = store.pull();
    info!(channel_id = %participant.channel_id, "mock backend pulled participant");
    StatusCode::OK
}

/// `POST /reset` — back to WAITING with no users.
async fn reset(State(store): State<MockStore>) -> StatusCode {
    store.reset();
    StatusCode::OK
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}


#[cfg(test)]
#[path = "mock_backend_test.rs"]
mod tests;
