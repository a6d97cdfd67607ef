//! Shared fakes for dispatch engine tests.
//!
//! Everything the engine touches goes through a seam, so the harness here
//! swaps in an in-memory store, a scripted attendance client, a recording
//! notifier, and a counting listener spawner.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use autosign_attend::{AttendError, AttendanceApi};
use autosign_core::settings::StaticSettings;
use autosign_core::types::SignSession;
use autosign_dispatch::dispatcher::{Dispatcher, QrListenerSpawner};
use autosign_notify::Notifier;
use autosign_store::MemoryStore;

/// Scripted outcome of one identity's active-signs fetch.
pub enum ListScript {
    Sessions(Vec<SignSession>),
    Invalid,
}

/// One recorded submission call.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub token: String,
    pub course_id: i64,
    pub sign_id: i64,
    pub coords: Option<(f64, f64)>,
}

/// Attendance client fake: scripted listings, canned submit response,
/// recorded submissions.
pub struct ScriptedApi {
    lists: Mutex<HashMap<String, ListScript>>,
    submit_body: String,
    pub submissions: Mutex<Vec<Submission>>,
}

impl ScriptedApi {
    pub fn new(submit_body: impl Into<String>) -> Self {
        Self {
            lists: Mutex::new(HashMap::new()),
            submit_body: submit_body.into(),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub async fn script_list(&self, token: &str, script: ListScript) {
        self.lists.lock().await.insert(token.to_string(), script);
    }

    pub async fn submission_count(&self) -> usize {
        self.submissions.lock().await.len()
    }
}

#[async_trait]
impl AttendanceApi for ScriptedApi {
    async fn list_active_sessions(&self, token: &str) -> Result<Vec<SignSession>, AttendError> {
        match self.lists.lock().await.get(token) {
            Some(ListScript::Sessions(sessions)) => Ok(sessions.clone()),
            Some(ListScript::Invalid) => Err(AttendError::InvalidIdentity),
            None => Ok(Vec::new()),
        }
    }

    async fn submit(
        &self,
        token: &str,
        course_id: i64,
        sign_id: i64,
        coords: Option<(f64, f64)>,
    ) -> Result<String, AttendError> {
        self.submissions.lock().await.push(Submission {
            token: token.to_string(),
            course_id,
            sign_id,
            coords,
        });
        Ok(self.submit_body.clone())
    }
}

/// Notifier fake that records every send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str, recipient: &str) {
        self.sent.lock().await.push((
            subject.to_string(),
            body.to_string(),
            recipient.to_string(),
        ));
    }
}

/// Listener-spawner fake that records requested (course, sign) pairs.
#[derive(Default)]
pub struct CountingSpawner {
    pub spawned: std::sync::Mutex<Vec<(i64, i64)>>,
}

impl QrListenerSpawner for CountingSpawner {
    fn spawn_listener(&self, course_id: i64, sign_id: i64) {
        self.spawned.lock().unwrap().push((course_id, sign_id));
    }
}

/// Everything a test needs, wired together.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub api: Arc<ScriptedApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub spawner: Arc<CountingSpawner>,
    pub settings: Arc<StaticSettings>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build a harness around a canned submit response body.
///
/// The submission delay is zero and the default coordinates are non-zero
/// so tests exercise resolution rather than the (0, 0) fallback.
pub fn harness(submit_body: &str) -> Harness {
    harness_with_delay(submit_body, Duration::ZERO)
}

pub fn harness_with_delay(submit_body: &str, submit_delay: Duration) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let api = Arc::new(ScriptedApi::new(submit_body));
    let notifier = Arc::new(RecordingNotifier::default());
    let spawner = Arc::new(CountingSpawner::default());
    let settings = Arc::new(StaticSettings {
        submit_delay,
        default_lat: 31.2304,
        default_lon: 121.4737,
        ..StaticSettings::default()
    });

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        api.clone(),
        notifier.clone(),
        settings.clone(),
        spawner.clone(),
    ));

    Harness {
        store,
        api,
        notifier,
        spawner,
        settings,
        dispatcher,
    }
}

/// A plain (non-GPS, non-QR) session.
pub fn plain_session(course_id: i64, sign_id: i64) -> SignSession {
    SignSession {
        course_id,
        sign_id,
        name: "Data Structures".to_string(),
        is_gps: 0,
        is_qr: 0,
    }
}
