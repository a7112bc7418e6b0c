//! Proxy card bindings and revenue reporting

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    Card, ProxyCardAssociation, ProxyCards, RevenueQuery, RevenueReport, RevenueSummary,
    RevenueWindow, Role, User,
};
use crate::error::DomainError;
use crate::repositories::{
    ActivationCodeRepository, CardRepository, ProxyRepository, UserRepository,
};

pub struct ProxyService {
    proxies: Arc<dyn ProxyRepository>,
    users: Arc<dyn UserRepository>,
    cards: Arc<dyn CardRepository>,
    codes: Arc<dyn ActivationCodeRepository>,
}

impl ProxyService {
    pub fn new(
        proxies: Arc<dyn ProxyRepository>,
        users: Arc<dyn UserRepository>,
        cards: Arc<dyn CardRepository>,
        codes: Arc<dyn ActivationCodeRepository>,
    ) -> Self {
        Self { proxies, users, cards, codes }
    }

    async fn find_proxy(&self, proxy_user_id: &Uuid) -> Result<User, DomainError> {
        let user = self.users.find_by_id(proxy_user_id).await?.ok_or(DomainError::UserNotFound)?;
        if !user.is_proxy() {
            return Err(DomainError::ValidationError(format!("user {} is not a proxy", user.username)));
        }
        Ok(user)
    }

    pub async fn link(
        &self,
        proxy_user_id: &Uuid,
        card_ids: &[Uuid],
    ) -> Result<Vec<ProxyCardAssociation>, DomainError> {
        let proxy = self.find_proxy(proxy_user_id).await?;

        let found = self.cards.find_by_ids(card_ids).await?;
        let missing: Vec<String> = card_ids
            .iter()
            .filter(|id| !found.iter().any(|c| c.id == **id && c.is_active))
            .map(Uuid::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::ValidationError(format!(
                "cards not found or inactive: {}",
                missing.join(", ")
            )));
        }

        let mut created = Vec::new();
        for card_id in card_ids {
            if self.proxies.find(&proxy.id, card_id).await?.is_some() {
                debug!("Proxy {} already bound to card {}", proxy.username, card_id);
                continue;
            }
            if created.iter().any(|a: &ProxyCardAssociation| a.card_id == *card_id) {
                continue;
            }
            let association = ProxyCardAssociation::new(proxy.id, *card_id);
            created.push(self.proxies.create(&association).await?);
        }
        info!("Bound {} cards to proxy {}", created.len(), proxy.username);
        Ok(created)
    }

    pub async fn unlink(&self, proxy_user_id: &Uuid, card_ids: &[Uuid]) -> Result<u64, DomainError> {
        let proxy = self.find_proxy(proxy_user_id).await?;
        let removed = self.proxies.delete(&proxy.id, card_ids).await?;
        info!("Unbound {} cards from proxy {}", removed, proxy.username);
        Ok(removed)
    }

    pub async fn cards_of(&self, actor: &User, proxy_user_id: &Uuid) -> Result<ProxyCards, DomainError> {
        if !actor.is_admin() && actor.id != *proxy_user_id {
            return Err(DomainError::Forbidden("cannot view another proxy's cards".to_string()));
        }
        let cards = self.bound_cards(proxy_user_id).await?;
        let total_count = cards.len();
        Ok(ProxyCards { proxy_user_id: *proxy_user_id, cards, total_count })
    }

    async fn bound_cards(&self, proxy_user_id: &Uuid) -> Result<Vec<Card>, DomainError> {
        let card_ids: Vec<Uuid> = self
            .proxies
            .list_by_proxy(proxy_user_id)
            .await?
            .into_iter()
            .map(|a| a.card_id)
            .collect();
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cards = self.cards.find_by_ids(&card_ids).await?;
        Ok(cards.into_iter().filter(|c| c.is_active).collect())
    }

    pub async fn associations(&self) -> Result<Vec<ProxyCardAssociation>, DomainError> {
        self.proxies.list_all().await
    }

    pub async fn has_card_access(&self, proxy_user_id: &Uuid, card_id: &Uuid) -> Result<bool, DomainError> {
        Ok(self.proxies.find(proxy_user_id, card_id).await?.is_some())
    }

    /// Proxies only ever see their own figures. Admins must target a proxy
    /// by id or search by username/name.
    pub async fn revenue(&self, actor: &User, query: RevenueQuery) -> Result<RevenueSummary, DomainError> {
        let window = RevenueWindow::new(query.start_date, query.end_date);

        let targets = match actor.role {
            Role::Proxy => vec![actor.clone()],
            Role::Admin => {
                if let Some(proxy_id) = &query.proxy_id {
                    vec![self.find_proxy(proxy_id).await?]
                } else if let Some(text) = query.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
                    self.users.search_proxies(text).await?
                } else {
                    return Err(DomainError::ValidationError(
                        "either proxy_id or query is required".to_string(),
                    ));
                }
            }
            _ => return Err(DomainError::Forbidden("revenue is limited to admins and proxies".to_string())),
        };

        let mut revenues = Vec::with_capacity(targets.len());
        for proxy in targets {
            revenues.push(self.revenue_of(&proxy, window).await?);
        }
        let total_count = revenues.len();
        Ok(RevenueSummary { revenues, total_count })
    }

    async fn revenue_of(&self, proxy: &User, window: RevenueWindow) -> Result<RevenueReport, DomainError> {
        let mut report = RevenueReport {
            proxy_user_id: proxy.id,
            proxy_username: proxy.username.clone(),
            proxy_name: proxy.name.clone(),
            total_revenue: 0.0,
            consumed_count: 0,
            start_date: window.start,
            end_date: window.end,
            query_time_range: "no bound cards".to_string(),
        };

        let card_ids: Vec<Uuid> = self
            .proxies
            .list_by_proxy(&proxy.id)
            .await?
            .into_iter()
            .map(|a| a.card_id)
            .collect();
        if card_ids.is_empty() {
            return Ok(report);
        }

        let prices: HashMap<Uuid, f64> = self
            .cards
            .find_by_ids(&card_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.price))
            .collect();
        for usage in self.codes.consumed_by_proxy(&proxy.id, &card_ids, window).await? {
            report.consumed_count += usage.consumed;
            report.total_revenue += usage.consumed as f64 * prices.get(&usage.card_id).copied().unwrap_or(0.0);
        }
        report.query_time_range = window.describe();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CodeStatus;
    use chrono::{Duration, Utc};

    use crate::test_utils::Fixture;

    fn service(fx: &Fixture) -> ProxyService {
        ProxyService::new(fx.db.clone(), fx.db.clone(), fx.db.clone(), fx.db.clone())
    }

    async fn consume(fx: &Fixture, index: usize) {
        let id = fx.codes[index].id;
        fx.db.transition(&id, CodeStatus::Available, CodeStatus::Consuming).await.unwrap();
        fx.db.transition(&id, CodeStatus::Consuming, CodeStatus::Consumed).await.unwrap();
    }

    #[tokio::test]
    async fn test_link_skips_existing_and_validates_cards() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let created = svc.link(&fx.proxy.id, &[fx.card.id, fx.other_card.id]).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].card_id, fx.other_card.id);
        assert_eq!(svc.associations().await.unwrap().len(), 2);

        let missing = Uuid::new_v4();
        match svc.link(&fx.proxy.id, &[missing]).await {
            Err(DomainError::ValidationError(msg)) => assert!(msg.contains(&missing.to_string())),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            svc.link(&fx.customer.id, &[fx.card.id]).await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_unlink_and_access() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(svc.has_card_access(&fx.proxy.id, &fx.card.id).await.unwrap());
        assert_eq!(svc.unlink(&fx.proxy.id, &[fx.card.id, fx.other_card.id]).await.unwrap(), 1);
        assert!(!svc.has_card_access(&fx.proxy.id, &fx.card.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cards_of_visibility() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let own = svc.cards_of(&fx.proxy, &fx.proxy.id).await.unwrap();
        assert_eq!(own.total_count, 1);
        assert_eq!(own.cards[0].id, fx.card.id);
        assert!(svc.cards_of(&fx.admin, &fx.proxy.id).await.is_ok());
        assert!(matches!(
            svc.cards_of(&fx.customer, &fx.proxy.id).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_revenue_for_proxy() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        consume(&fx, 0).await;
        consume(&fx, 1).await;
        consume(&fx, 2).await;

        let summary = svc.revenue(&fx.proxy, RevenueQuery::default()).await.unwrap();
        assert_eq!(summary.total_count, 1);
        let report = &summary.revenues[0];
        assert_eq!(report.consumed_count, 2);
        assert_eq!(report.total_revenue, 20.0);
        assert_eq!(report.query_time_range, "all time");

        let future = RevenueQuery { start_date: Some(Utc::now() + Duration::hours(1)), ..Default::default() };
        let later = svc.revenue(&fx.proxy, future).await.unwrap();
        assert_eq!(later.revenues[0].consumed_count, 0);
        assert!(later.revenues[0].query_time_range.starts_with("from "));
    }

    #[tokio::test]
    async fn test_revenue_admin_targeting() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(matches!(
            svc.revenue(&fx.admin, RevenueQuery::default()).await,
            Err(DomainError::ValidationError(_))
        ));
        let by_id = RevenueQuery { proxy_id: Some(fx.staff.id), ..Default::default() };
        assert!(matches!(svc.revenue(&fx.admin, by_id).await, Err(DomainError::ValidationError(_))));

        let search = RevenueQuery { query: Some("PROXY".into()), ..Default::default() };
        assert_eq!(svc.revenue(&fx.admin, search).await.unwrap().total_count, 1);

        let nobody = RevenueQuery { query: Some("nobody".into()), ..Default::default() };
        assert_eq!(svc.revenue(&fx.admin, nobody).await.unwrap().total_count, 0);

        assert!(matches!(
            svc.revenue(&fx.staff, RevenueQuery::default()).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_revenue_without_bound_cards() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        consume(&fx, 0).await;
        svc.unlink(&fx.proxy.id, &[fx.card.id]).await.unwrap();

        let summary = svc.revenue(&fx.proxy, RevenueQuery::default()).await.unwrap();
        assert_eq!(summary.revenues[0].total_revenue, 0.0);
        assert_eq!(summary.revenues[0].query_time_range, "no bound cards");
    }
}
