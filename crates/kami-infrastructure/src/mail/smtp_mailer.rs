// ============================================================================
// Kami Infrastructure - SMTP Mailer
// File: crates/kami-infrastructure/src/mail/smtp_mailer.rs
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use kami_core::error::DomainError;
use kami_core::mail::{MailContent, Mailer};
use kami_shared::config::MailSettings;

/// Delivers mail through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport without connecting; the first send opens the
    /// connection.
    pub fn new(settings: &MailSettings) -> Result<Self, DomainError> {
        let address = settings
            .sender_email
            .parse()
            .map_err(|e| DomainError::MailError(format!("invalid sender address: {e}")))?;
        let from = Mailbox::new(Some(settings.sender_name.clone()), address);

        let host = settings.smtp_host.as_str();
        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else if settings.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
        }
        .map_err(|e| DomainError::MailError(format!("invalid smtp host {host}: {e}")))?;

        let mut builder = builder
            .port(settings.smtp_port)
            .timeout(Some(Duration::from_secs(settings.timeout_secs)));
        if !settings.sender_password.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.sender_email.clone(),
                settings.sender_password.clone(),
            ));
        }

        info!("SMTP mailer configured for {}:{}", host, settings.smtp_port);
        Ok(Self { transport: builder.build(), from })
    }

    fn build_message(&self, mail: &MailContent) -> Result<Message, DomainError> {
        if mail.to.is_empty() {
            return Err(DomainError::MailError("message has no recipients".to_string()));
        }
        let mut builder = Message::builder().from(self.from.clone()).subject(mail.subject.as_str());
        for to in &mail.to {
            let mailbox: Mailbox = to
                .parse()
                .map_err(|e| DomainError::MailError(format!("invalid recipient {to}: {e}")))?;
            builder = builder.to(mailbox);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                mail.text_body.clone(),
                mail.html_body.clone(),
            ))
            .map_err(|e| DomainError::MailError(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &MailContent) -> Result<(), DomainError> {
        let message = self.build_message(mail)?;
        self.transport.send(message).await.map_err(|e| {
            error!("SMTP delivery of '{}' failed: {}", mail.subject, e);
            DomainError::MailError(e.to_string())
        })?;
        Ok(())
    }
}
