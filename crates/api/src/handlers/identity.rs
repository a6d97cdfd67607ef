//! Handlers for registering and enumerating monitored identities.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use autosign_store::keys;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Lifetime of an identity record. Expiry silently drops the identity from
/// future poll cycles; re-registering refreshes the clock.
pub const IDENTITY_TTL: Duration = Duration::from_secs(4 * 3600);

/// Forced lifetime applied when the registration probe reports the token
/// as invalid.
const INVALID_IDENTITY_EXPIRY: Duration = Duration::from_secs(1);

/// Request body for registering (or refreshing) an identity.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Opaque platform-issued bearer token.
    #[serde(rename = "openId")]
    #[validate(length(min = 32, max = 32, message = "openId must be 32 characters"))]
    pub open_id: String,
    /// Stored value; doubles as the notification recipient address.
    #[validate(length(min = 1, message = "value must not be empty"))]
    pub value: String,
    /// Optional GPS override, `"lon,lat"` decimal degrees.
    #[serde(default)]
    pub location: String,
}

/// POST /identities
///
/// Stores the identity (4-hour TTL) and optional GPS override, then probes
/// the platform once to verify the token. The probe outcome is reported in
/// the response body; an invalid token is force-expired so the scheduler
/// never polls it.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<Value>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let identity_key = keys::identity(&request.open_id);
    state
        .store
        .set(&identity_key, &request.value, Some(IDENTITY_TTL))
        .await?;

    let location = request.location.trim();
    if !location.is_empty() {
        state
            .store
            .set(&keys::gps_override(&request.open_id), location, None)
            .await?;
        tracing::info!(token = %request.open_id, location, "GPS override saved");
    }

    match state.attendance.list_active_sessions(&request.open_id).await {
        Ok(_) => {
            tracing::info!(token = %request.open_id, "Identity added to the watch pool");
            Ok(Json(json!({
                "message": "Identity added to the watch pool."
            })))
        }
        Err(e) => {
            tracing::info!(token = %request.open_id, error = %e, "Registration probe failed");
            if matches!(e, autosign_attend::AttendError::InvalidIdentity) {
                if let Err(e) = state.store.expire(&identity_key, INVALID_IDENTITY_EXPIRY).await {
                    tracing::warn!(error = %e, "Failed to expire invalid identity");
                }
            }
            Ok(Json(json!({
                "message": "The provided openId looks invalid; please check it and retry."
            })))
        }
    }
}

/// GET /identities
///
/// Enumerate the tokens currently in the watch pool.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let found = state.store.scan(&keys::identity_pattern()).await?;
    let open_ids: Vec<&str> = found
        .iter()
        .filter_map(|key| keys::token_from_identity_key(key))
        .collect();

    Ok(Json(json!({
        "openIds": open_ids,
        "count": open_ids.len(),
    })))
}
