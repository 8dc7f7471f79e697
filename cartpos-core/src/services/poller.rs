//! Background status polling
//!
//! While the user is signed in and the app is in the foreground, the poller
//! re-checks the account every interval so a deactivation by an administrator
//! takes effect without a restart. Coming back to the foreground triggers an
//! immediate check. Nothing runs while signed out or backgrounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::domain::SessionState;
use crate::services::session::SessionManager;

/// Default time between checks while foregrounded
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Host application visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Foreground,
    Background,
}

pub struct StatusPoller {
    manager: Arc<SessionManager>,
    period: Duration,
}

impl StatusPoller {
    pub fn new(manager: Arc<SessionManager>, period: Duration) -> Self {
        Self { manager, period }
    }

    /// Start polling on the current tokio runtime
    ///
    /// The app is assumed to be in the foreground. Polling stops when the
    /// returned handle is shut down or dropped.
    pub fn spawn(self) -> PollerHandle {
        let (lifecycle_tx, lifecycle_rx) = watch::channel(AppLifecycle::Foreground);
        let task = tokio::spawn(run(self.manager, self.period, lifecycle_rx));

        PollerHandle {
            lifecycle: lifecycle_tx,
            task: Some(task),
        }
    }
}

/// Owning handle to a running poller
pub struct PollerHandle {
    lifecycle: watch::Sender<AppLifecycle>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Host came to the foreground
    pub fn notify_foreground(&self) {
        self.lifecycle.send_replace(AppLifecycle::Foreground);
    }

    /// Host went to the background
    pub fn notify_background(&self) {
        self.lifecycle.send_replace(AppLifecycle::Background);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and wait for the task to wind down
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run(
    manager: Arc<SessionManager>,
    period: Duration,
    mut lifecycle: watch::Receiver<AppLifecycle>,
) {
    let mut state = manager.subscribe_state();

    loop {
        let authenticated = *state.borrow_and_update() == SessionState::Authenticated;
        let foreground = *lifecycle.borrow_and_update() == AppLifecycle::Foreground;

        // Restarted from scratch on every state or lifecycle change
        let mut ticker = (authenticated && foreground).then(|| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        tracing::trace!(authenticated, foreground, "poller armed");

        loop {
            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                changed = lifecycle.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let resumed = !foreground && *lifecycle.borrow() == AppLifecycle::Foreground;
                    if resumed && authenticated {
                        tracing::debug!("app resumed, checking session");
                        manager.check_status().await;
                    }
                    break;
                }
                _ = next_tick(&mut ticker) => {
                    tracing::debug!("poll interval elapsed, checking session");
                    manager.check_status().await;
                }
            }
        }
    }
}
