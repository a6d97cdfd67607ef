//! Domain types shared across the workspace.
//!
//! [`SignSession`] mirrors one entry of the upstream platform's
//! active-signs response. The `isGPS`/`isQR` flags are integers on the
//! wire and are independent of each other -- a session can carry both.

use serde::Deserialize;

/// One active sign-in session, as returned by the attendance platform.
///
/// Produced fresh on every poll; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignSession {
    /// Upstream course identifier.
    pub course_id: i64,
    /// Upstream sign-in session identifier.
    pub sign_id: i64,
    /// Human-readable course name, used in notification subjects.
    #[serde(default)]
    pub name: String,
    /// GPS flag. `1` means the session expects submitted coordinates.
    #[serde(default, rename = "isGPS")]
    pub is_gps: i32,
    /// QR flag. Any non-zero value means the session is QR-code based
    /// and must be completed manually by the user.
    #[serde(default, rename = "isQR")]
    pub is_qr: i32,
}

impl SignSession {
    /// Whether the session expects GPS coordinates in the submission.
    pub fn wants_gps(&self) -> bool {
        self.is_gps == 1
    }

    /// Whether the session is QR-code based (never auto-submitted).
    pub fn wants_qr(&self) -> bool {
        self.is_qr != 0
    }

    /// Neither flag set: a plain one-click sign-in.
    pub fn is_plain(&self) -> bool {
        self.is_gps + self.is_qr == 0
    }
}

/// Rank information embedded in a successful sign-in response.
///
/// Only present when the raw response body contains the `studentRank`
/// fragment; missing fields default to zero, matching the tolerant
/// decoding of the rest of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResult {
    /// Ordinal of this sign-in event within the course.
    #[serde(default)]
    pub sign_rank: i64,
    /// Position of this student among everyone who signed in.
    #[serde(default)]
    pub student_rank: i64,
}
