//! Production wiring for the dispatcher's listener seam.

use std::sync::Arc;

use autosign_dispatch::dispatcher::QrListenerSpawner;
use autosign_store::TtlStore;

/// Starts real push-protocol listener sessions against the upstream.
pub struct PushListeners {
    store: Arc<dyn TtlStore>,
}

impl PushListeners {
    pub fn new(store: Arc<dyn TtlStore>) -> Self {
        Self { store }
    }
}

impl QrListenerSpawner for PushListeners {
    fn spawn_listener(&self, course_id: i64, sign_id: i64) {
        autosign_qr::spawn(Arc::clone(&self.store), course_id, sign_id);
    }
}
