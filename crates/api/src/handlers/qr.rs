//! Handlers for the QR viewing flow: pending-QR polling, cache reads, and
//! manual listener re-arming.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use autosign_store::keys;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /qr/pending/{token}
///
/// Read-and-clear the pending-QR marker for an identity, so a polling
/// viewer sees each pending QR exactly once. Returns zeroed ids when
/// nothing is pending.
pub async fn pending(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<Value>> {
    let marker_key = keys::qr_pending(&token);
    let raw = match state.store.get(&marker_key).await? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(Json(json!({ "signId": 0, "courseId": 0 }))),
    };

    // Consumed on read; a second poll must come up empty.
    state.store.delete(&marker_key).await?;

    let (course_id, sign_id) = parse_pending_value(&raw);
    if sign_id > 0 {
        let mut url = format!("/qr.html?sign={sign_id}");
        if course_id > 0 {
            url.push_str(&format!("&course={course_id}"));
        }
        url.push_str(&format!("&v={}", chrono::Utc::now().timestamp()));
        Ok(Json(json!({
            "signId": sign_id,
            "courseId": course_id,
            "url": url,
        })))
    } else {
        Ok(Json(json!({ "signId": 0, "courseId": course_id })))
    }
}

/// GET /qr/{sign_id}
///
/// Current cached QR URL for a sign session, empty string when absent.
pub async fn current(
    State(state): State<AppState>,
    Path(sign_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let url = state.store.get(&keys::qr_url(sign_id)).await?;
    Ok(Json(json!({ "qrUrl": url.unwrap_or_default() })))
}

/// Query parameters for the listener re-arm endpoint.
#[derive(Debug, Deserialize)]
pub struct ListenQuery {
    #[serde(rename = "courseId")]
    pub course_id: i64,
    #[serde(rename = "signId")]
    pub sign_id: i64,
}

/// POST /qr/listen
///
/// Re-arm a listener for (courseId, signId). Useful after a service
/// restart, or when a user opens the QR page late; the new session simply
/// joins any that already watch the same sign.
pub async fn listen(
    State(state): State<AppState>,
    Query(query): Query<ListenQuery>,
) -> AppResult<Json<Value>> {
    if query.course_id <= 0 || query.sign_id <= 0 {
        return Err(AppError::BadRequest(
            "courseId and signId must be positive".to_string(),
        ));
    }

    autosign_qr::spawn(Arc::clone(&state.store), query.course_id, query.sign_id);
    Ok(Json(json!({ "ok": true })))
}

/// Parse a pending marker value into `(course_id, sign_id)`.
///
/// Accepts the three formats that have existed in the wild: a bare
/// `signId`, `courseId,signId`, and `courseId:signId`. Unparseable parts
/// decode to zero.
fn parse_pending_value(raw: &str) -> (i64, i64) {
    let raw = raw.trim();
    let separator = if raw.contains(',') {
        Some(',')
    } else if raw.contains(':') {
        Some(':')
    } else {
        None
    };

    match separator {
        Some(separator) => {
            let mut parts = raw.splitn(2, separator);
            let course_id = parts
                .next()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(0);
            let sign_id = parts
                .next()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(0);
            (course_id, sign_id)
        }
        None => (0, raw.parse().unwrap_or(0)),
    }
}
