//! HTTP client for the upstream attendance platform.
//!
//! Two operations: list the active sign-in sessions visible to an identity,
//! and submit one sign-in. Both authenticate with a single `Openid` header
//! carrying the opaque identity token, and both are inspected for literal
//! status substrings rather than structured error codes -- that is how the
//! upstream reports outcomes.
//!
//! [`AttendanceApi`] is the seam the dispatch engine depends on;
//! [`HttpAttendanceApi`] is the reqwest-backed implementation.

use async_trait::async_trait;
use autosign_core::types::SignSession;

/// Active-signs listing endpoint.
const ACTIVE_SIGNS_URL: &str =
    "https://v18.teachermate.cn/wechat-api/v1/class-attendance/student/active_signs";

/// Sign-in submission endpoint.
const SIGN_IN_URL: &str =
    "https://v18.teachermate.cn/wechat-api/v1/class-attendance/student-sign-in";

/// Browser User-Agent the upstream expects.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0";

/// Host header matching the upstream endpoints.
const HOST: &str = "v18.teachermate.cn";

/// Exact response body the upstream returns for a dead login session.
const INVALID_LOGIN_BODY: &str = r#"{"message":"登录信息失效，请退出后重试"}"#;

/// Response fragment indicating the platform already recorded this sign-in.
pub const ALREADY_SIGNED_FRAGMENT: &str = "你已经签到成功";

/// Response fragment present when a submission succeeded with rank data.
pub const RANK_FRAGMENT: &str = "studentRank";

/// Errors from the attendance client.
#[derive(Debug, thiserror::Error)]
pub enum AttendError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform rejected the identity token as no longer logged in.
    #[error("identity token rejected by the platform")]
    InvalidIdentity,
}

/// Client seam for the two upstream operations.
#[async_trait]
pub trait AttendanceApi: Send + Sync + 'static {
    /// List the active sign-in sessions for an identity.
    ///
    /// Returns [`AttendError::InvalidIdentity`] when the upstream reports
    /// the token's login session as expired; the caller is responsible for
    /// force-expiring the stored identity record.
    async fn list_active_sessions(&self, token: &str) -> Result<Vec<SignSession>, AttendError>;

    /// Submit one sign-in, optionally with `(lat, lon)` coordinates.
    ///
    /// Returns the raw response body; callers inspect it for the literal
    /// status fragments ([`ALREADY_SIGNED_FRAGMENT`], [`RANK_FRAGMENT`]).
    async fn submit(
        &self,
        token: &str,
        course_id: i64,
        sign_id: i64,
        coords: Option<(f64, f64)>,
    ) -> Result<String, AttendError>;
}

/// reqwest-backed [`AttendanceApi`].
pub struct HttpAttendanceApi {
    client: reqwest::Client,
}

impl HttpAttendanceApi {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpAttendanceApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceApi for HttpAttendanceApi {
    async fn list_active_sessions(&self, token: &str) -> Result<Vec<SignSession>, AttendError> {
        let body = self
            .client
            .get(ACTIVE_SIGNS_URL)
            .header("User-Agent", USER_AGENT)
            .header("Openid", token)
            .header("Host", HOST)
            .send()
            .await?
            .text()
            .await?;

        tracing::debug!(token, body = %body, "Active signs response");

        if body == INVALID_LOGIN_BODY {
            return Err(AttendError::InvalidIdentity);
        }

        // A body that is not a session list (maintenance page, error blob)
        // reads as "no active sessions" rather than failing the poll.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn submit(
        &self,
        token: &str,
        course_id: i64,
        sign_id: i64,
        coords: Option<(f64, f64)>,
    ) -> Result<String, AttendError> {
        let mut request = self
            .client
            .post(SIGN_IN_URL)
            .header("User-Agent", USER_AGENT)
            .header("Openid", token)
            .header("Host", HOST)
            .header("Content-Type", "application/json")
            .body(build_submit_body(course_id, sign_id, coords));

        // Coordinates go in the headers as well as the body; the upstream
        // reads whichever it feels like depending on the sign type.
        if let Some((lat, lon)) = coords {
            request = request
                .header("lat", format_coord(lat))
                .header("lon", format_coord(lon));
        }

        let body = request.send().await?.text().await?;
        Ok(body)
    }
}

/// Six-decimal coordinate rendering, the precision the upstream stores.
pub fn format_coord(value: f64) -> String {
    format!("{value:.6}")
}

/// Build the submission body: bare identifiers for plain sessions,
/// identifiers plus coordinates when the session expects GPS.
pub fn build_submit_body(course_id: i64, sign_id: i64, coords: Option<(f64, f64)>) -> String {
    match coords {
        Some((lat, lon)) => format!(
            r#"{{"courseId":{course_id},"signId":{sign_id},"lat":{lat},"lon":{lon}}}"#,
            lat = format_coord(lat),
            lon = format_coord(lon),
        ),
        None => format!(r#"{{"courseId":{course_id},"signId":{sign_id}}}"#),
    }
}
