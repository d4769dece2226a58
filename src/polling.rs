//! Non-overlapping periodic refresh.
//!
//! DESIGN
//! ======
//! `PollingLoop` owns at most one timer task at a time. The timer task drives
//! a `tokio::time::Interval` and polls the in-flight refresh future itself, so
//! the "is a refresh running?" check and the start of the next refresh happen
//! inside one task without locking. A tick that lands while a refresh is in
//! flight is dropped, never queued: under a slow backend the effective rate
//! falls below the nominal one instead of piling up concurrent requests.
//!
//! The in-flight flag lives on the `PollingLoop`, not on the timer. After a
//! reconfiguration the replaced timer keeps driving its in-flight refresh to
//! completion in the background, and the new timer skips ticks until it
//! settles.
//!
//! CANCELLATION
//! ============
//! Stopping (explicitly, by reconfiguring, or by dropping the loop) fires a
//! oneshot. The timer task checks it before anything else and again when a
//! tick fires, and a tick's refresh is first polled inside the tick handler,
//! so the task never begins a refresh once the stop is visible to it. A
//! refresh already running is not aborted and is not awaited by the caller.
//!
//! ERROR HANDLING
//! ==============
//! Refresh errors and panics are logged and swallowed. They never disarm the
//! timer.

use std::error::Error;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Failure reported by a [`RefreshTask`]. Logged by the loop, never propagated.
pub type RefreshError = Box<dyn Error + Send + Sync>;

/// The unit of work a [`PollingLoop`] runs on every tick.
#[async_trait::async_trait]
pub trait RefreshTask: Send + Sync {
    /// Run one refresh. The result is only logged.
    async fn refresh(&self) -> Result<(), RefreshError>;
}

// =============================================================================
// POLLING LOOP
// =============================================================================

/// Periodic trigger with at most one refresh in flight.
pub struct PollingLoop {
    timer: Option<Timer>,
    refreshing: Arc<AtomicBool>,
}

/// Handle to an armed timer task.
struct Timer {
    period: Duration,
    task: Arc<dyn RefreshTask>,
    stop: oneshot::Sender<()>,
}

impl PollingLoop {
    #[must_use]
    pub fn new() -> Self {
        Self { timer: None, refreshing: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel any current timer and arm a new one firing every `period`,
    /// first one `period` from now. A zero period leaves the loop disarmed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, period: Duration, task: Arc<dyn RefreshTask>) {
        self.stop();
        if period.is_zero() {
            debug!("polling disabled");
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let first_tick = Instant::now() + period;
        tokio::spawn(run_timer(period, first_tick, Arc::clone(&task), Arc::clone(&self.refreshing), stop_rx));
        info!(interval = ?period, "polling timer armed");

        self.timer = Some(Timer { period, task, stop: stop_tx });
    }

    /// Apply the latest interval and task. Re-arms only when either changed,
    /// so calling this repeatedly with the same values keeps the tick phase.
    pub fn configure(&mut self, period: Duration, task: Arc<dyn RefreshTask>) {
        let unchanged = match &self.timer {
            Some(timer) => timer.period == period && Arc::ptr_eq(&timer.task, &task),
            None => period.is_zero(),
        };
        if !unchanged {
            self.start(period, task);
        }
    }

    /// Disarm the timer. In-flight refreshes run to completion on their own.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            // Send fails only if the timer task is already gone.
            let _ = timer.stop.send(());
            info!(interval = ?timer.period, "polling timer disarmed");
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Interval of the armed timer, if any.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(|timer| timer.period)
    }
}

impl Default for PollingLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollingLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// TIMER TASK
// =============================================================================

/// Clears the in-flight flag when the refresh settles or is dropped.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn run_timer(
    period: Duration,
    first_tick: Instant,
    task: Arc<dyn RefreshTask>,
    refreshing: Arc<AtomicBool>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    // Ticks stay anchored to the arm time; overlap is handled by skipping.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut in_flight: Option<BoxFuture<'static, ()>> = None;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            () = settle(&mut in_flight) => in_flight = None,
            _ = ticker.tick() => {
                // A stop that raced the tick wins; nothing new is started.
                if !matches!(stop.try_recv(), Err(TryRecvError::Empty)) {
                    break;
                }
                if refreshing.swap(true, Ordering::AcqRel) {
                    debug!("refresh still in flight; tick skipped");
                    continue;
                }
                // Start the refresh here so a later stop never begins one.
                let mut refresh = invoke(Arc::clone(&task), InFlight(Arc::clone(&refreshing)));
                if futures::poll!(&mut refresh).is_pending() {
                    in_flight = Some(refresh);
                }
            }
        }
    }

    if let Some(refresh) = in_flight {
        debug!("timer stopped; finishing in-flight refresh in background");
        refresh.await;
    }
}

/// Resolve when the in-flight refresh settles; pend forever when idle.
async fn settle(in_flight: &mut Option<BoxFuture<'static, ()>>) {
    match in_flight {
        Some(refresh) => refresh.await,
        None => std::future::pending().await,
    }
}

fn invoke(task: Arc<dyn RefreshTask>, guard: InFlight) -> BoxFuture<'static, ()> {
    async move {
        let _guard = guard;
        match AssertUnwindSafe(task.refresh()).catch_unwind().await {
            Ok(Ok(())) => debug!("refresh completed"),
            Ok(Err(e)) => warn!(error = %e, "refresh failed"),
            Err(_) => error!("refresh panicked"),
        }
    }
    .boxed()
}

#[cfg(test)]
#[path = "polling_test.rs"]
mod tests;
