//! Shared helpers for api integration tests.
//!
//! Builds the real router over an in-memory store and a scripted
//! attendance client; requests go through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;

use autosign_api::routes;
use autosign_api::state::AppState;
use autosign_attend::{AttendError, AttendanceApi};
use autosign_core::types::SignSession;
use autosign_store::MemoryStore;

/// Probe stub that accepts every token (returns an empty session list).
pub struct AcceptingApi;

#[async_trait]
impl AttendanceApi for AcceptingApi {
    async fn list_active_sessions(&self, _token: &str) -> Result<Vec<SignSession>, AttendError> {
        Ok(Vec::new())
    }

    async fn submit(
        &self,
        _token: &str,
        _course_id: i64,
        _sign_id: i64,
        _coords: Option<(f64, f64)>,
    ) -> Result<String, AttendError> {
        Ok(String::new())
    }
}

/// Probe stub that rejects every token as invalid.
pub struct RejectingApi;

#[async_trait]
impl AttendanceApi for RejectingApi {
    async fn list_active_sessions(&self, _token: &str) -> Result<Vec<SignSession>, AttendError> {
        Err(AttendError::InvalidIdentity)
    }

    async fn submit(
        &self,
        _token: &str,
        _course_id: i64,
        _sign_id: i64,
        _coords: Option<(f64, f64)>,
    ) -> Result<String, AttendError> {
        Err(AttendError::InvalidIdentity)
    }
}

/// Build the application router over the given fakes.
pub fn build_test_app(store: Arc<MemoryStore>, attendance: Arc<dyn AttendanceApi>) -> Router {
    let state = AppState { store, attendance };
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .with_state(state)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
