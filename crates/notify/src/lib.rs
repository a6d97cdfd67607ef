//! User notification delivery.
//!
//! The dispatch engine tells users about sign-in outcomes by plain-text
//! e-mail. Delivery is strictly best-effort: when mail is disabled in the
//! configuration, or the recipient is unknown, or SMTP fails, the send is
//! logged and dropped -- no caller ever sees a notification error.
//!
//! [`Notifier`] is the seam; [`SmtpNotifier`] delivers over `lettre`'s
//! async SMTP transport, resolving the mail configuration freshly from the
//! [`Settings`] provider on every send.
//!
//! [`Settings`]: autosign_core::settings::Settings

use std::sync::Arc;

use async_trait::async_trait;
use autosign_core::settings::{MailSettings, Settings};

/// Error type for e-mail delivery failures. Internal to this crate's
/// logging; never crosses the [`Notifier`] seam.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Fire-and-forget notification seam.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Send one notification. Never fails from the caller's perspective.
    async fn notify(&self, subject: &str, body: &str, recipient: &str);
}

/// SMTP-backed [`Notifier`].
pub struct SmtpNotifier {
    settings: Arc<dyn Settings>,
}

impl SmtpNotifier {
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        Self { settings }
    }

    async fn deliver(
        &self,
        mail: &MailSettings,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<(), NotifyError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(mail.from.parse()?)
            .to(recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.host)?.port(mail.port);

        if let (Some(user), Some(pass)) = (&mail.username, &mail.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str, recipient: &str) {
        // Resolved fresh on every send so the enable flag and credentials
        // can be flipped on a running service.
        let mail = self.settings.mail();
        if !mail.enabled || mail.host.is_empty() {
            tracing::debug!(subject, "Mail disabled; dropping notification");
            return;
        }
        if recipient.trim().is_empty() {
            tracing::debug!(subject, "No recipient on file; dropping notification");
            return;
        }

        match self.deliver(&mail, subject, body, recipient).await {
            Ok(()) => tracing::info!(to = recipient, subject, "Notification email sent"),
            Err(e) => {
                tracing::error!(to = recipient, subject, error = %e, "Failed to send notification email");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autosign_core::settings::StaticSettings;

    #[tokio::test]
    async fn disabled_mail_drops_the_send_without_touching_smtp() {
        // StaticSettings defaults to mail disabled with an empty host; a
        // delivery attempt against that host would error loudly.
        let notifier = SmtpNotifier::new(Arc::new(StaticSettings::default()));
        notifier.notify("subject", "body", "user@example.com").await;
    }

    #[tokio::test]
    async fn empty_recipient_drops_the_send() {
        let settings = StaticSettings {
            mail: MailSettings {
                enabled: true,
                host: "smtp.example.com".into(),
                port: 587,
                username: None,
                password: None,
                from: "noreply@example.com".into(),
            },
            ..StaticSettings::default()
        };
        let notifier = SmtpNotifier::new(Arc::new(settings));
        notifier.notify("subject", "body", "   ").await;
    }

    #[test]
    fn notify_error_display_build() {
        let err = NotifyError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn notify_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = NotifyError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
