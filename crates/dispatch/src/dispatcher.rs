//! Per-session dispatch state machine.
//!
//! One [`Dispatcher::run`] invocation handles one fetched (identity,
//! session) pair end to end: duplicate check, QR handling, humanized
//! delay, coordinate resolution, submission, and result notification.
//! The invocation produces side effects only -- store writes, notification
//! sends, at most one HTTP submission -- and reports nothing back to its
//! spawner. Failures are logged and end the worker.

use std::sync::Arc;

use autosign_attend::{AttendanceApi, ALREADY_SIGNED_FRAGMENT, RANK_FRAGMENT};
use autosign_core::settings::Settings;
use autosign_core::types::{SignResult, SignSession};
use autosign_notify::Notifier;
use autosign_store::{keys, TtlStore};
use rand::Rng;

use crate::{cooldown, gps};

/// Lifetime of the pending-QR marker a viewer can poll for.
pub const PENDING_QR_TTL: std::time::Duration = std::time::Duration::from_secs(10 * 60);

/// Starts QR listener sessions on behalf of the dispatcher.
///
/// A seam rather than a direct call so the engine can be exercised without
/// opening real push connections; the production implementation simply
/// spawns a detached listener task.
pub trait QrListenerSpawner: Send + Sync + 'static {
    fn spawn_listener(&self, course_id: i64, sign_id: i64);
}

/// Worker that runs the dispatch state machine for one session.
pub struct Dispatcher {
    store: Arc<dyn TtlStore>,
    api: Arc<dyn AttendanceApi>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn Settings>,
    listeners: Arc<dyn QrListenerSpawner>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn TtlStore>,
        api: Arc<dyn AttendanceApi>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn Settings>,
        listeners: Arc<dyn QrListenerSpawner>,
    ) -> Self {
        Self {
            store,
            api,
            notifier,
            settings,
            listeners,
        }
    }

    /// Handle one fetched session for one identity.
    pub async fn run(&self, token: &str, session: SignSession) {
        // Correlates the log lines of one dispatch across its sleep.
        let dispatch_id: u32 = rand::rng().random_range(0..=1000);
        let course_id = session.course_id;
        let sign_id = session.sign_id;

        if cooldown::exists(self.store.as_ref(), token, sign_id).await {
            tracing::debug!(dispatch_id, token, sign_id, "Duplicate sign-in; skipping");
            return;
        }

        if session.wants_qr() {
            self.handle_qr(dispatch_id, token, &session).await;
            // Falls through: the freshly armed cooldown makes the re-check
            // below terminal for QR sessions.
        }

        // Humanized reaction delay before GPS and plain submissions; a
        // QR-only session skips it (it will be stopped by the re-check
        // either way).
        if session.wants_gps() || session.is_plain() {
            let delay = self.settings.submit_delay();
            tracing::debug!(dispatch_id, token, sign_id, delay_secs = delay.as_secs(), "Delaying submission");
            tokio::time::sleep(delay).await;
        }

        if cooldown::exists(self.store.as_ref(), token, sign_id).await {
            tracing::debug!(dispatch_id, token, sign_id, "Handled while delaying; skipping");
            return;
        }

        let (mut lat, mut lon) = gps::resolve(self.store.as_ref(), self.settings.as_ref(), token).await;
        if session.wants_gps() {
            (lat, lon) = gps::jitter(lat, lon);
            tracing::debug!(dispatch_id, lat, lon, "Jittered submission coordinates");
        }

        let coords = session.wants_gps().then_some((lat, lon));
        let body = match self.api.submit(token, course_id, sign_id, coords).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(dispatch_id, token, sign_id, error = %e, "Sign-in submission failed");
                return;
            }
        };
        tracing::info!(dispatch_id, token, sign_id, body = %body, "Sign-in response");

        // The platform may have recorded this sign-in through another path
        // (a second instance, the user's own phone) before we did; honor
        // its verdict by arming the cooldown ourselves.
        if body.contains(ALREADY_SIGNED_FRAGMENT) {
            cooldown::arm(self.store.as_ref(), token, sign_id).await;
        }

        if body.contains(RANK_FRAGMENT) {
            self.notify_success(token, &session, decode_rank(&body)).await;
        }
    }

    /// QR branch: point the user at the live QR page, start a listener to
    /// feed it, and arm the cooldown so this session never auto-submits.
    async fn handle_qr(&self, dispatch_id: u32, token: &str, session: &SignSession) {
        let page = qr_page_url(&self.settings.public_url(), session.course_id, session.sign_id);
        tracing::info!(
            dispatch_id,
            token,
            sign_id = session.sign_id,
            page = %page,
            "QR sign-in detected; needs a manual scan",
        );

        let subject = format!("{} QR sign-in needs a manual scan", session.name);
        let body = format!(
            "Open the QR page below (tap the link or paste it into a browser) and scan \
             the code with WeChat to finish signing in.\n\
             After a manual scan the registered token may become invalid immediately; \
             register a fresh token to keep monitoring.\n\
             QR page: {page}"
        );

        self.notifier
            .notify(&subject, &body, &self.recipient(token).await)
            .await;
        self.listeners
            .spawn_listener(session.course_id, session.sign_id);

        let pending = format!("{},{}", session.course_id, session.sign_id);
        if let Err(e) = self
            .store
            .set(&keys::qr_pending(token), &pending, Some(PENDING_QR_TTL))
            .await
        {
            tracing::warn!(dispatch_id, token, error = %e, "Failed to write pending-QR marker");
        }

        cooldown::arm(self.store.as_ref(), token, session.sign_id).await;
    }

    async fn notify_success(&self, token: &str, session: &SignSession, result: SignResult) {
        let subject = format!("{} just signed in!", session.name);
        let body = format!(
            "[Sign-in No.{}] You were number {} to sign in. This message is informational; \
             the platform record is authoritative. [{}/C{}/S{}/{}]",
            result.sign_rank,
            result.student_rank,
            session.name,
            session.course_id,
            session.sign_id,
            token,
        );
        self.notifier
            .notify(&subject, &body, &self.recipient(token).await)
            .await;
    }

    /// The identity's stored value doubles as its notification address.
    async fn recipient(&self, token: &str) -> String {
        match self.store.get(&keys::identity(token)).await {
            Ok(Some(value)) => value,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(token, error = %e, "Failed to look up notification recipient");
                String::new()
            }
        }
    }
}

/// Build the link to the live QR page for one session. The `v` parameter
/// busts browser caches on repeated notifications for the same sign.
fn qr_page_url(base_url: &str, course_id: i64, sign_id: i64) -> String {
    format!(
        "{}/qr.html?sign={sign_id}&course={course_id}&v={}",
        base_url.trim_end_matches('/'),
        chrono::Utc::now().timestamp(),
    )
}

/// Tolerant decode of the rank payload: an unparseable body yields zeroed
/// ranks rather than suppressing the notification.
fn decode_rank(body: &str) -> SignResult {
    serde_json::from_str(body).unwrap_or_default()
}
