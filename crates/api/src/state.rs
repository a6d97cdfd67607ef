use std::sync::Arc;

use autosign_attend::AttendanceApi;
use autosign_store::TtlStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared TTL store (identities, overrides, markers, QR cache).
    pub store: Arc<dyn TtlStore>,
    /// Upstream attendance platform client, used for registration probes.
    pub attendance: Arc<dyn AttendanceApi>,
}
