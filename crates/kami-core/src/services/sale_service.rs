//! Direct card sales delivered by e-mail

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use kami_shared::constants::{MAX_ORDER_PAGE, REPORT_DATETIME_FORMAT};
use kami_shared::utils::{mask_email, normalize_email};
use tracing::{info, warn};
use validator::ValidateEmail;

use crate::domain::{Sale, SaleRequest, SalesStats, User};
use crate::error::DomainError;
use crate::mail::PurchaseConfirmation;
use crate::repositories::{
    ActivationCodeRepository, CardRepository, OrderRepository, SaleRepository,
};
use crate::services::MailService;

pub struct SaleService {
    sales: Arc<dyn SaleRepository>,
    cards: Arc<dyn CardRepository>,
    codes: Arc<dyn ActivationCodeRepository>,
    orders: Arc<dyn OrderRepository>,
    mail: Arc<MailService>,
}

fn start_of_today() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

impl SaleService {
    pub fn new(
        sales: Arc<dyn SaleRepository>,
        cards: Arc<dyn CardRepository>,
        codes: Arc<dyn ActivationCodeRepository>,
        orders: Arc<dyn OrderRepository>,
        mail: Arc<MailService>,
    ) -> Self {
        Self { sales, cards, codes, orders, mail }
    }

    /// Claims one unsold code of the card and mails it to `user_email`.
    /// The sale stands even when the confirmation cannot be delivered.
    pub async fn purchase(&self, user: &User, card_name: &str, user_email: &str) -> Result<Sale, DomainError> {
        let email = normalize_email(user_email);
        if !email.validate_email() {
            return Err(DomainError::ValidationError("invalid email address".to_string()));
        }
        let card = self
            .cards
            .find_by_name(card_name.trim())
            .await?
            .ok_or(DomainError::CardNotFound)?;
        if !card.is_active {
            return Err(DomainError::ValidationError(format!("card '{}' is not on sale", card.name)));
        }

        let request = SaleRequest {
            user_id: user.id,
            card_id: card.id,
            card_name: card.name.clone(),
            user_email: email,
            sale_price: card.price,
            channel_id: card.channel_id,
        };
        let sale = self
            .sales
            .create_with_claim(&request)
            .await?
            .ok_or_else(|| DomainError::OutOfStock(card.name.clone()))?;
        info!("Sale {} of '{}' to {}", sale.id, sale.card_name, mask_email(&sale.user_email));

        let confirmation = PurchaseConfirmation {
            card_name: sale.card_name.clone(),
            activation_code: sale.activation_code.clone(),
            sale_price: sale.sale_price,
            purchased_at: sale.purchased_at.format(REPORT_DATETIME_FORMAT).to_string(),
        };
        if let Err(e) = self.mail.send_purchase_confirmation(&sale.user_email, &confirmation).await {
            warn!("Purchase confirmation for sale {} not delivered: {}", sale.id, e);
        }
        Ok(sale)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Sale>, DomainError> {
        self.sales.list(limit.clamp(1, MAX_ORDER_PAGE), offset.max(0)).await
    }

    pub async fn by_email(&self, email: &str) -> Result<Vec<Sale>, DomainError> {
        self.sales.list_by_email(&normalize_email(email)).await
    }

    pub async fn stats(&self) -> Result<SalesStats, DomainError> {
        let totals = self.sales.totals(start_of_today()).await?;
        let total_stock = self.codes.count_stock(None).await?;
        let orders = self.orders.stats().await?;
        Ok(SalesStats {
            total_sales: totals.total_sales,
            total_revenue: totals.total_revenue,
            today_sales: totals.today_sales,
            today_revenue: totals.today_revenue,
            total_stock,
            pending_orders: orders.processing_orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CardChanges;
    use crate::test_utils::Fixture;

    fn service(fx: &Fixture) -> SaleService {
        let mail = Arc::new(MailService::new(fx.mailer.clone()).unwrap());
        SaleService::new(fx.db.clone(), fx.db.clone(), fx.db.clone(), fx.db.clone(), mail)
    }

    #[tokio::test]
    async fn test_purchase_claims_code_and_mails_it() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let sale = svc.purchase(&fx.customer, "Card B", "Buyer@Example.com").await.unwrap();
        assert_eq!(sale.sale_price, 20.0);
        assert_eq!(sale.user_email, "buyer@example.com");
        assert_eq!(sale.channel_id, fx.other_channel.id);

        let code = fx.db.code(&sale.activation_code).unwrap();
        assert!(code.is_sold);
        assert!(code.is_available());

        let sent = fx.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["buyer@example.com".to_string()]);
        assert!(sent[0].text_body.contains(&sale.activation_code));
    }

    #[tokio::test]
    async fn test_purchase_until_out_of_stock() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let first = svc.purchase(&fx.customer, "Card B", "a@example.com").await.unwrap();
        let second = svc.purchase(&fx.customer, "Card B", "a@example.com").await.unwrap();
        assert_ne!(first.activation_code, second.activation_code);
        assert!(matches!(
            svc.purchase(&fx.customer, "Card B", "a@example.com").await,
            Err(DomainError::OutOfStock(_))
        ));
    }

    #[tokio::test]
    async fn test_purchase_rejects_unknown_inactive_and_bad_email() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(matches!(
            svc.purchase(&fx.customer, "Nope", "a@example.com").await,
            Err(DomainError::CardNotFound)
        ));
        assert!(matches!(
            svc.purchase(&fx.customer, "Card A", "not-an-email").await,
            Err(DomainError::ValidationError(_))
        ));

        let mut card = fx.card.clone();
        card.apply(CardChanges { is_active: Some(false), ..Default::default() }).unwrap();
        CardRepository::update(fx.db.as_ref(), &card).await.unwrap();
        assert!(matches!(
            svc.purchase(&fx.customer, "Card A", "a@example.com").await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_sale() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        fx.mailer.set_failing(true);

        let sale = svc.purchase(&fx.customer, "Card A", "a@example.com").await.unwrap();
        assert!(fx.db.code(&sale.activation_code).unwrap().is_sold);
        assert_eq!(svc.by_email("A@EXAMPLE.COM").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        svc.purchase(&fx.customer, "Card A", "a@example.com").await.unwrap();
        svc.purchase(&fx.customer, "Card B", "b@example.com").await.unwrap();

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total_sales, 2);
        assert_eq!(stats.total_revenue, 30.0);
        assert_eq!(stats.today_sales, 2);
        assert_eq!(stats.today_revenue, 30.0);
        assert_eq!(stats.total_stock, 5);
        assert_eq!(stats.pending_orders, 0);

        assert_eq!(svc.list(10, 0).await.unwrap().len(), 2);
        assert_eq!(svc.list(10, 1).await.unwrap().len(), 1);
    }
}
