//! Key families used in the shared store.
//!
//! Keeping every key constructor in one place makes the namespace easy to
//! audit and keeps the scan patterns in sync with the writers.

/// Prefix for identity records. The suffix is the opaque identity token;
/// the stored value doubles as the notification recipient address.
pub const IDENTITY_PREFIX: &str = "autosign:user:";

/// Identity record for `token` (4-hour TTL, written on registration).
pub fn identity(token: &str) -> String {
    format!("{IDENTITY_PREFIX}{token}")
}

/// Scan pattern matching every identity record.
pub fn identity_pattern() -> String {
    format!("{IDENTITY_PREFIX}*")
}

/// Extract the identity token from a scanned identity key.
pub fn token_from_identity_key(key: &str) -> Option<&str> {
    key.strip_prefix(IDENTITY_PREFIX)
        .filter(|token| !token.trim().is_empty())
}

/// Per-identity GPS override, value `"lon,lat"` (no TTL).
pub fn gps_override(token: &str) -> String {
    format!("autosign:gps:{token}")
}

/// Cooldown marker for one (identity, sign) pair.
///
/// Token and sign id are concatenated without a separator; the upstream
/// deployment shipped with this format and existing markers must keep
/// matching across upgrades.
pub fn cooldown(token: &str, sign_id: i64) -> String {
    format!("autosign:repeat:{token}{sign_id}")
}

/// Pending-QR marker for an identity, value `"courseId,signId"`.
pub fn qr_pending(token: &str) -> String {
    format!("autosign:qr:pending:{token}")
}

/// Latest observed QR URL for a sign session.
pub fn qr_url(sign_id: i64) -> String {
    format!("autosign:qr:{sign_id}")
}
