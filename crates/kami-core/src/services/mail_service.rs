//! Renders and dispatches platform e-mail through the `Mailer` port.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DomainError;
use crate::mail::{Mailer, MailTemplates, NewOrderNotification, PurchaseConfirmation};

pub struct MailService {
    mailer: Arc<dyn Mailer>,
    templates: MailTemplates,
}

impl MailService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Result<Self, DomainError> {
        Ok(Self {
            mailer,
            templates: MailTemplates::new()?,
        })
    }

    pub async fn send_purchase_confirmation(
        &self,
        to: &str,
        data: &PurchaseConfirmation,
    ) -> Result<(), DomainError> {
        let mail = self.templates.purchase_confirmation(to, data)?;
        self.mailer.send(&mail).await?;
        info!(
            "Purchase confirmation sent to {}",
            kami_shared::utils::mask_email(to)
        );
        Ok(())
    }

    pub async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        ttl_minutes: u64,
    ) -> Result<(), DomainError> {
        let mail = self.templates.verification_code(to, code, ttl_minutes)?;
        self.mailer.send(&mail).await
    }

    /// Sends one message addressed to all `recipients`. No recipients is a no-op.
    pub async fn notify_new_order(
        &self,
        recipients: Vec<String>,
        data: &NewOrderNotification,
    ) -> Result<(), DomainError> {
        if recipients.is_empty() {
            debug!("No staff recipients for order {}", data.order_id);
            return Ok(());
        }
        let count = recipients.len();
        let mail = self.templates.new_order_notification(recipients, data)?;
        self.mailer.send(&mail).await?;
        info!("New order {} notified to {} staff", data.order_id, count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MockMailer;

    fn notification() -> NewOrderNotification {
        NewOrderNotification {
            order_id: "42".into(),
            card_name: "Card A".into(),
            activation_code: "ABCD-EFGH-JKLM-NPQR".into(),
            created_at: "2024-01-01 00:00:00".into(),
            channel_name: "Channel One".into(),
        }
    }

    #[tokio::test]
    async fn test_notify_sends_one_mail_to_all_recipients() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|mail| mail.to.len() == 2 && mail.subject.contains("Card A"))
            .times(1)
            .returning(|_| Ok(()));

        let service = MailService::new(Arc::new(mailer)).unwrap();
        service
            .notify_new_order(
                vec!["a@example.com".into(), "b@example.com".into()],
                &notification(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_notify_without_recipients_is_noop() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(0);

        let service = MailService::new(Arc::new(mailer)).unwrap();
        assert!(service.notify_new_order(vec![], &notification()).await.is_ok());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_| Err(DomainError::MailError("connection refused".into())));

        let service = MailService::new(Arc::new(mailer)).unwrap();
        let result = service.send_verification_code("u@example.com", "123456", 5).await;
        assert!(matches!(result, Err(DomainError::MailError(_))));
    }
}
