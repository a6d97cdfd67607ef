//! Fixed-interval polling fan-out.
//!
//! Every cycle the scheduler enumerates tracked identities from the store,
//! fetches each identity's active sessions, and spawns one detached
//! dispatcher task per (identity, session). It never waits for spawned
//! work -- overlapping cycles are possible and accepted -- and no single
//! identity's failure aborts the cycle for the others.

use std::sync::Arc;
use std::time::Duration;

use autosign_attend::{AttendError, AttendanceApi};
use autosign_core::settings::Settings;
use autosign_store::{keys, TtlStore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::dispatcher::Dispatcher;

/// Forced lifetime applied to an identity the platform reports as invalid,
/// so the next cycles stop polling for it almost immediately.
const INVALID_IDENTITY_EXPIRY: Duration = Duration::from_secs(1);

/// The polling scheduler.
pub struct Scheduler {
    store: Arc<dyn TtlStore>,
    api: Arc<dyn AttendanceApi>,
    settings: Arc<dyn Settings>,
    dispatcher: Arc<Dispatcher>,
    tracker: TaskTracker,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn TtlStore>,
        api: Arc<dyn AttendanceApi>,
        settings: Arc<dyn Settings>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store,
            api,
            settings,
            dispatcher,
            tracker: TaskTracker::new(),
        }
    }

    /// Tracker counting the spawned dispatcher tasks.
    ///
    /// Production code never waits on it; a test harness can `close()` and
    /// `wait()` it to let one generation of spawned work drain.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Run poll cycles until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("Polling scheduler started");
        loop {
            // Re-read every cycle so the interval is live-tunable.
            let interval = self.settings.poll_interval();
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Polling scheduler stopping");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    self.tick().await;
                }
            }
        }
    }

    /// One poll cycle: enumerate identities and fan out dispatches.
    pub async fn tick(&self) {
        let identity_keys = match self.store.scan(&keys::identity_pattern()).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, "Identity scan failed; skipping cycle");
                return;
            }
        };

        for key in identity_keys {
            let Some(token) = keys::token_from_identity_key(&key) else {
                continue;
            };

            match self.api.list_active_sessions(token).await {
                Ok(sessions) => {
                    for session in sessions {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        let token = token.to_string();
                        self.tracker.spawn(async move {
                            dispatcher.run(&token, session).await;
                        });
                    }
                }
                Err(AttendError::InvalidIdentity) => {
                    tracing::info!(token, "Identity rejected by the platform; forcing expiry");
                    if let Err(e) = self.store.expire(&key, INVALID_IDENTITY_EXPIRY).await {
                        tracing::warn!(token, error = %e, "Failed to expire invalid identity");
                    }
                }
                Err(e) => {
                    tracing::warn!(token, error = %e, "Failed to fetch active sessions");
                }
            }
        }
    }
}
