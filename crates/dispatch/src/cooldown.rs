//! Advisory duplicate-work guard.
//!
//! A cooldown marker per (identity, sign) pair says "recently handled".
//! Check and arm are two separate store calls on purpose: the design
//! accepts at most one extra duplicate from a lost race instead of
//! requiring a conditional-set primitive from the store contract. A store
//! failure on either side degrades to "no marker" and is logged.

use std::time::Duration;

use autosign_store::{keys, TtlStore};

/// How long a marker suppresses repeat handling.
pub const COOLDOWN_TTL: Duration = Duration::from_secs(5 * 60);

/// Whether a cooldown marker currently exists for this pair.
pub async fn exists(store: &dyn TtlStore, token: &str, sign_id: i64) -> bool {
    match store.get(&keys::cooldown(token, sign_id)).await {
        Ok(marker) => marker.is_some(),
        Err(e) => {
            tracing::warn!(sign_id, error = %e, "Cooldown check failed; treating as absent");
            false
        }
    }
}

/// Arm the marker for this pair.
pub async fn arm(store: &dyn TtlStore, token: &str, sign_id: i64) {
    let key = keys::cooldown(token, sign_id);
    if let Err(e) = store
        .set(&key, &sign_id.to_string(), Some(COOLDOWN_TTL))
        .await
    {
        tracing::warn!(sign_id, error = %e, "Failed to arm cooldown marker");
    }
}
