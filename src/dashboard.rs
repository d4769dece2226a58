//! Dashboard state and operator actions.
//!
//! DESIGN
//! ======
//! `Dashboard` owns the view model the terminal renders. Every mutation goes
//! through `Shared::update`, which applies the change under a short mutex
//! hold (never across an await) and bumps a `watch` revision so renderers
//! can redraw. `refresh` is the unit of work the `PollingLoop` drives.
//!
//! Operator actions (switch, pull, reset) share one pipeline: raise the
//! action's loading flag, send the request, and on success post an info
//! message and refresh. Info messages expire after a short delay unless a
//! newer one has replaced them, tracked with a generation counter.
//!
//! ERROR HANDLING
//! ==============
//! Failures are reported twice: as a user-facing `error_message` on the view
//! and as the returned `Result` for callers that want to log or test it. A
//! refresh failing after a successful action does not fail the action.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::UtcOffset;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, MonitorApi};
use crate::clock::{Clock, format_hms};
use crate::participant::{Participant, normalize_users};
use crate::polling::{RefreshError, RefreshTask};
use crate::sort::sort_users_stable;

pub const NEVER_UPDATED: &str = "--:--:--";
pub const REFRESH_FAILED_MESSAGE: &str = "Update failed. Please try again shortly.";
pub const MISSING_VIDEO_ID_MESSAGE: &str = "Enter a videoId.";
const SWITCH_RETRY_HINT: &str = " Try again after the stream has started.";
const INFO_MESSAGE_TTL: Duration = Duration::from_secs(2);

// =============================================================================
// VIEW
// =============================================================================

/// In-progress flags, one per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loading {
    pub switching: bool,
    pub pulling: bool,
    pub resetting: bool,
    pub refreshing: bool,
}

impl Loading {
    #[must_use]
    pub fn any(self) -> bool {
        self.switching || self.pulling || self.resetting || self.refreshing
    }
}

/// Everything the terminal renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub active: bool,
    /// Sorted with [`sort_users_stable`] on every successful refresh.
    pub users: Vec<Participant>,
    pub video_id: String,
    pub interval_secs: u64,
    /// `HH:MM:SS` of the last refresh attempt.
    pub last_updated: String,
    /// `Last pull: HH:MM:SS` after a successful pull.
    pub last_fetch_time: Option<String>,
    pub error_message: Option<String>,
    pub info_message: Option<String>,
    pub loading: Loading,
}

impl DashboardView {
    fn new(interval_secs: u64) -> Self {
        Self {
            active: false,
            users: Vec::new(),
            video_id: String::new(),
            interval_secs,
            last_updated: NEVER_UPDATED.to_owned(),
            last_fetch_time: None,
            error_message: None,
            info_message: None,
            loading: Loading::default(),
        }
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("no video id entered")]
    MissingVideoId,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Switch,
    Pull,
    Reset,
}

impl Action {
    fn success_message(self) -> &'static str {
        match self {
            Self::Switch => "Switched.",
            Self::Pull => "Pulled.",
            Self::Reset => "Reset.",
        }
    }

    fn failure_message(self) -> String {
        match self {
            Self::Switch => format!("Switch failed.{SWITCH_RETRY_HINT}"),
            Self::Pull => "Pull failed.".to_owned(),
            Self::Reset => "Reset failed.".to_owned(),
        }
    }

    fn flag(self, loading: &mut Loading) -> &mut bool {
        match self {
            Self::Switch => &mut loading.switching,
            Self::Pull => &mut loading.pulling,
            Self::Reset => &mut loading.resetting,
        }
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

pub struct Dashboard {
    api: Arc<dyn MonitorApi>,
    clock: Arc<dyn Clock>,
    offset: UtcOffset,
    shared: Arc<Shared>,
}

struct Shared {
    view: Mutex<DashboardView>,
    revision: watch::Sender<u64>,
    info_generation: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DashboardView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut DashboardView)) {
        apply(&mut self.lock());
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

impl Dashboard {
    #[must_use]
    pub fn new(api: Arc<dyn MonitorApi>, clock: Arc<dyn Clock>, offset: UtcOffset, interval_secs: u64) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            clock,
            offset,
            shared: Arc::new(Shared {
                view: Mutex::new(DashboardView::new(interval_secs)),
                revision,
                info_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Copy of the current view.
    #[must_use]
    pub fn snapshot(&self) -> DashboardView {
        self.shared.lock().clone()
    }

    /// Receiver that changes on every view mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn set_video_id(&self, video_id: impl Into<String>) {
        let video_id = video_id.into();
        self.shared.update(|view| view.video_id = video_id);
    }

    pub fn set_interval_secs(&self, interval_secs: u64) {
        self.shared.update(|view| view.interval_secs = interval_secs);
    }

    /// Fetch status and users together and replace the view's copy.
    ///
    /// # Errors
    ///
    /// Returns the first [`ApiError`] from either request. The view then
    /// carries [`REFRESH_FAILED_MESSAGE`] and keeps its previous users.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.shared.update(|view| view.loading.refreshing = true);

        let fetched = tokio::try_join!(self.api.status(), self.api.users());
        let stamp = format_hms(self.clock.now(), self.offset);

        match fetched {
            Ok((status, entries)) => {
                let users = sort_users_stable(&normalize_users(entries));
                info!(status = status.status.as_str(), users = users.len(), "dashboard refreshed");
                self.shared.update(|view| {
                    view.active = status.is_active();
                    view.users = users;
                    view.error_message = None;
                    view.last_updated = stamp;
                    view.loading.refreshing = false;
                });
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, code = e.error_code(), "dashboard refresh failed");
                self.shared.update(|view| {
                    view.error_message = Some(REFRESH_FAILED_MESSAGE.to_owned());
                    view.last_updated = stamp;
                    view.loading.refreshing = false;
                });
                Err(e)
            }
        }
    }

    /// Point the backend at the entered video id.
    ///
    /// # Errors
    ///
    /// [`ActionError::MissingVideoId`] when no id is entered (nothing is
    /// sent), otherwise the request's [`ApiError`].
    pub async fn switch_video(&self) -> Result<(), ActionError> {
        let video_id = self.shared.lock().video_id.trim().to_owned();
        if video_id.is_empty() {
            self.shared.update(|view| view.error_message = Some(MISSING_VIDEO_ID_MESSAGE.to_owned()));
            return Err(ActionError::MissingVideoId);
        }
        let api = Arc::clone(&self.api);
        self.run_action(Action::Switch, async move { api.switch_video(&video_id).await }).await
    }

    /// Ask the backend to pull chat messages now.
    ///
    /// # Errors
    ///
    /// Returns the request's [`ApiError`].
    pub async fn pull(&self) -> Result<(), ActionError> {
        self.run_action(Action::Pull, self.api.pull()).await
    }

    /// Clear the backend's session.
    ///
    /// # Errors
    ///
    /// Returns the request's [`ApiError`].
    pub async fn reset(&self) -> Result<(), ActionError> {
        self.run_action(Action::Reset, self.api.reset()).await
    }

    async fn run_action(
        &self,
        action: Action,
        request: impl Future<Output = Result<(), ApiError>>,
    ) -> Result<(), ActionError> {
        self.shared.update(|view| *action.flag(&mut view.loading) = true);

        let outcome = request.await;
        match &outcome {
            Ok(()) => {
                info!(?action, "action succeeded");
                let pulled_at = (action == Action::Pull)
                    .then(|| format!("Last pull: {}", format_hms(self.clock.now(), self.offset)));
                self.shared.update(|view| {
                    view.error_message = None;
                    if let Some(pulled_at) = pulled_at {
                        view.last_fetch_time = Some(pulled_at);
                    }
                });
                self.post_info(action.success_message());
                // Failure is already on the view as the refresh error message.
                let _ = self.refresh().await;
            }
            Err(e) => {
                warn!(?action, error = %e, "action failed");
                self.shared.update(|view| view.error_message = Some(action.failure_message()));
            }
        }

        self.shared.update(|view| *action.flag(&mut view.loading) = false);
        outcome.map_err(ActionError::from)
    }

    /// Show `message` and clear it after the TTL unless replaced meanwhile.
    fn post_info(&self, message: &str) {
        let generation = self.shared.info_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let message = message.to_owned();
        self.shared.update(|view| view.info_message = Some(message));

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(INFO_MESSAGE_TTL).await;
            if shared.info_generation.load(Ordering::SeqCst) == generation {
                shared.update(|view| view.info_message = None);
            }
        });
    }
}

#[async_trait::async_trait]
impl RefreshTask for Dashboard {
    async fn refresh(&self) -> Result<(), RefreshError> {
        Dashboard::refresh(self).await.map_err(Into::into)
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
