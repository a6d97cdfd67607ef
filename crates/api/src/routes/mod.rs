//! Route tree assembly.

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{identity, qr};
use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/identities", post(identity::register).get(identity::list))
        .route("/qr/pending/{token}", get(qr::pending))
        .route("/qr/listen", post(qr::listen))
        .route("/qr/{sign_id}", get(qr::current))
}
