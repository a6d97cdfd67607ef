//! Live-tunable configuration provider.
//!
//! The dispatch engine reads its tunables (poll interval, submission delay,
//! default coordinates, mail credentials) *at the point of use*, never once
//! at startup, so operators can adjust them on a running service. That
//! contract is captured by the [`Settings`] trait: implementations must
//! return the current value on every call.
//!
//! [`EnvSettings`] is the production implementation (environment variables,
//! re-read per call). [`StaticSettings`] returns fixed values and is what
//! test harnesses inject.

use std::time::Duration;

/// Mail delivery configuration, resolved fresh for every send.
#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    /// Master switch. When off, notifications silently no-op.
    pub enabled: bool,
    /// SMTP server hostname. An empty host also disables delivery.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Optional SMTP username.
    pub username: Option<String>,
    /// Optional SMTP password.
    pub password: Option<String>,
    /// RFC 5322 "From" address.
    pub from: String,
}

/// Read-only provider of live configuration values.
///
/// Every accessor must reflect the current configuration at call time;
/// callers are expected to invoke them each cycle / each send rather than
/// caching the result.
pub trait Settings: Send + Sync + 'static {
    /// How long the scheduler sleeps between poll cycles.
    fn poll_interval(&self) -> Duration;

    /// Artificial delay before a GPS or plain submission is sent.
    fn submit_delay(&self) -> Duration;

    /// Static default coordinates as `(lat, lon)` decimal degrees.
    fn default_coords(&self) -> (f64, f64);

    /// Public base URL of this service, used to build QR page links.
    fn public_url(&self) -> String;

    /// Current mail delivery configuration.
    fn mail(&self) -> MailSettings;
}

/// Default scheduler poll interval in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 8;

/// Default pre-submission delay in seconds.
const DEFAULT_SUBMIT_DELAY_SECS: u64 = 20;

/// Default public base URL.
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@autosign.local";

/// Production [`Settings`] backed by environment variables.
///
/// Every accessor re-reads the environment, so values changed in the
/// process environment (or via an orchestrator that restarts with new
/// vars) take effect without code-level caching getting in the way.
///
/// | Variable             | Default                  |
/// |----------------------|--------------------------|
/// | `POLL_INTERVAL_SECS` | `8`                      |
/// | `SUBMIT_DELAY_SECS`  | `20`                     |
/// | `DEFAULT_LAT`        | `0.0`                    |
/// | `DEFAULT_LON`        | `0.0`                    |
/// | `PUBLIC_URL`         | `http://localhost:8080`  |
/// | `MAIL_ENABLED`       | `false`                  |
/// | `SMTP_HOST`          | —                        |
/// | `SMTP_PORT`          | `587`                    |
/// | `SMTP_USER`          | —                        |
/// | `SMTP_PASSWORD`      | —                        |
/// | `SMTP_FROM`          | `noreply@autosign.local` |
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl EnvSettings {
    fn var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

impl Settings for EnvSettings {
    fn poll_interval(&self) -> Duration {
        Duration::from_secs(Self::var_or("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS))
    }

    fn submit_delay(&self) -> Duration {
        Duration::from_secs(Self::var_or("SUBMIT_DELAY_SECS", DEFAULT_SUBMIT_DELAY_SECS))
    }

    fn default_coords(&self) -> (f64, f64) {
        (
            Self::var_or("DEFAULT_LAT", 0.0),
            Self::var_or("DEFAULT_LON", 0.0),
        )
    }

    fn public_url(&self) -> String {
        std::env::var("PUBLIC_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string())
    }

    fn mail(&self) -> MailSettings {
        MailSettings {
            enabled: Self::var_or("MAIL_ENABLED", false),
            host: std::env::var("SMTP_HOST").unwrap_or_default(),
            port: Self::var_or("SMTP_PORT", DEFAULT_SMTP_PORT),
            username: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
        }
    }
}

/// Fixed-value [`Settings`] for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub poll_interval: Duration,
    pub submit_delay: Duration,
    pub default_lat: f64,
    pub default_lon: f64,
    pub public_url: String,
    pub mail: MailSettings,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            submit_delay: Duration::from_secs(DEFAULT_SUBMIT_DELAY_SECS),
            default_lat: 0.0,
            default_lon: 0.0,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            mail: MailSettings::default(),
        }
    }
}

impl Settings for StaticSettings {
    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn submit_delay(&self) -> Duration {
        self.submit_delay
    }

    fn default_coords(&self) -> (f64, f64) {
        (self.default_lat, self.default_lon)
    }

    fn public_url(&self) -> String {
        self.public_url.clone()
    }

    fn mail(&self) -> MailSettings {
        self.mail.clone()
    }
}
