//! Mailer used when SMTP delivery is disabled. Messages are logged, never sent.

use async_trait::async_trait;
use tracing::info;

use kami_core::error::DomainError;
use kami_core::mail::{MailContent, Mailer};
use kami_shared::utils::mask_email;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &MailContent) -> Result<(), DomainError> {
        let recipients: Vec<String> = mail.to.iter().map(|to| mask_email(to)).collect();
        info!(
            recipients = %recipients.join(", "),
            subject = %mail.subject,
            "Mail delivery disabled; message not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let mail = MailContent {
            to: vec!["someone@example.com".into()],
            subject: "hello".into(),
            html_body: "<p>hi</p>".into(),
            text_body: "hi".into(),
        };
        assert!(LogMailer.send(&mail).await.is_ok());
    }
}
