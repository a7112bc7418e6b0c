// ============================================================================
// Kami Core - Activation Code Service
// File: crates/kami-core/src/services/activation_code_service.rs
// ============================================================================
//! Code generation, lookup, lifecycle transitions and proxy export

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kami_security::code::{
    generate_activation_code, is_well_formed_activation_code, normalize_activation_code,
};
use kami_shared::constants::MAX_CODES_PER_BATCH;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ActivationCode, Card, CodeCheck, CodeFilter, CodeStatus, Role, User};
use crate::error::DomainError;
use crate::repositories::{
    ActivationCodeRepository, CardRepository, ChannelRepository, UserRepository,
};

#[derive(Debug, Clone, Serialize)]
pub struct CardSummary {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        Self { id: card.id, name: card.name.clone(), price: card.price }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableCode {
    pub id: Uuid,
    pub code: String,
    pub status: CodeStatus,
    pub exported: bool,
    pub proxy_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub card: Option<CardSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableCodes {
    pub codes: Vec<AvailableCode>,
    pub total_count: usize,
}

pub struct ActivationCodeService {
    codes: Arc<dyn ActivationCodeRepository>,
    cards: Arc<dyn CardRepository>,
    channels: Arc<dyn ChannelRepository>,
    users: Arc<dyn UserRepository>,
}

impl ActivationCodeService {
    pub fn new(
        codes: Arc<dyn ActivationCodeRepository>,
        cards: Arc<dyn CardRepository>,
        channels: Arc<dyn ChannelRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { codes, cards, channels, users }
    }

    async fn find_card(&self, card_id: &Uuid) -> Result<Card, DomainError> {
        self.cards.find_by_id(card_id).await?.ok_or(DomainError::CardNotFound)
    }

    pub async fn generate(
        &self,
        card_id: &Uuid,
        count: u32,
        proxy_user_id: Option<Uuid>,
    ) -> Result<Vec<ActivationCode>, DomainError> {
        if count == 0 || count > MAX_CODES_PER_BATCH {
            return Err(DomainError::ValidationError(format!(
                "count must be between 1 and {}",
                MAX_CODES_PER_BATCH
            )));
        }
        let card = self.find_card(card_id).await?;
        if self.channels.find_by_id(&card.channel_id).await?.is_none() {
            return Err(DomainError::ChannelNotFound);
        }
        if let Some(proxy_id) = &proxy_user_id {
            let proxy = self.users.find_by_id(proxy_id).await?.ok_or(DomainError::UserNotFound)?;
            if !proxy.is_proxy() {
                return Err(DomainError::ValidationError(format!(
                    "user {} is not a proxy",
                    proxy.username
                )));
            }
        }

        let mut seen = HashSet::with_capacity(count as usize);
        let mut batch = Vec::with_capacity(count as usize);
        while batch.len() < count as usize {
            let code = generate_activation_code();
            if seen.insert(code.clone()) {
                batch.push(ActivationCode::new(card.id, code, proxy_user_id));
            }
        }

        let created = self.codes.create_batch(&batch).await?;
        info!("Generated {} codes for card '{}'", created.len(), card.name);
        Ok(created)
    }

    pub async fn get_by_code(&self, code: &str) -> Result<ActivationCode, DomainError> {
        self.codes
            .find_by_code(&normalize_activation_code(code))
            .await?
            .ok_or(DomainError::ActivationCodeNotFound)
    }

    /// Public availability probe. Reveals the channel only for codes that
    /// can still be redeemed.
    pub async fn check(&self, code: &str) -> Result<CodeCheck, DomainError> {
        let code = normalize_activation_code(code);
        if !is_well_formed_activation_code(&code) {
            return Ok(CodeCheck::unavailable());
        }
        let Some(found) = self.codes.find_by_code(&code).await? else {
            return Ok(CodeCheck::unavailable());
        };
        if !found.is_available() {
            return Ok(CodeCheck::unavailable());
        }
        match self.cards.find_by_id(&found.card_id).await? {
            Some(card) => Ok(CodeCheck { available: true, channel_id: Some(card.channel_id) }),
            None => Ok(CodeCheck::unavailable()),
        }
    }

    pub async fn check_for_user(&self, code: &str, user: &User) -> Result<bool, DomainError> {
        let Some(found) = self.codes.find_by_code(&normalize_activation_code(code)).await? else {
            return Ok(false);
        };
        if !found.is_available() {
            return Ok(false);
        }
        if user.is_staff() {
            let card = self.cards.find_by_id(&found.card_id).await?;
            return Ok(card.is_some_and(|c| user.staff_channel() == Some(c.channel_id)));
        }
        Ok(true)
    }

    pub async fn list_by_card(
        &self,
        card_id: &Uuid,
        filter: &CodeFilter,
    ) -> Result<Vec<ActivationCode>, DomainError> {
        self.find_card(card_id).await?;
        self.codes.list_by_card(card_id, filter).await
    }

    pub async fn count_by_card(&self, card_id: &Uuid, only_unused: bool) -> Result<i64, DomainError> {
        self.find_card(card_id).await?;
        self.codes.count_by_card(card_id, only_unused).await
    }

    pub async fn delete_by_card(&self, card_id: &Uuid) -> Result<u64, DomainError> {
        let deleted = self.codes.delete_by_card(card_id).await?;
        info!("Deleted {} codes of card {}", deleted, card_id);
        Ok(deleted)
    }

    pub async fn set_consuming(&self, code: &str) -> Result<ActivationCode, DomainError> {
        self.advance(code, CodeStatus::Available, CodeStatus::Consuming).await
    }

    pub async fn set_consumed(&self, code: &str) -> Result<ActivationCode, DomainError> {
        self.advance(code, CodeStatus::Consuming, CodeStatus::Consumed).await
    }

    async fn advance(
        &self,
        code: &str,
        from: CodeStatus,
        to: CodeStatus,
    ) -> Result<ActivationCode, DomainError> {
        let found = self.get_by_code(code).await?;
        if found.status != from {
            return Err(DomainError::InvalidCodeStatus(format!(
                "{} is {}, expected {}",
                found.code,
                found.status.as_str(),
                from.as_str()
            )));
        }
        self.codes.transition(&found.id, from, to).await?.ok_or_else(|| {
            warn!("Lost transition race on code {}", found.code);
            DomainError::InvalidCodeStatus(format!("{} changed concurrently", found.code))
        })
    }

    /// Codes of the card that are still available and unsold.
    pub async fn stock(&self, card_id: &Uuid) -> Result<i64, DomainError> {
        self.find_card(card_id).await?;
        self.codes.count_stock(Some(*card_id)).await
    }

    /// Admins see every available code, proxies only the ones credited to them.
    pub async fn available_for(&self, user: &User) -> Result<AvailableCodes, DomainError> {
        user.require_role(&[Role::Admin, Role::Proxy])?;
        let scope = if user.is_proxy() { Some(user.id) } else { None };
        let codes = self.codes.list_available(scope).await?;

        let card_ids: Vec<Uuid> = codes
            .iter()
            .map(|c| c.card_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let cards: HashMap<Uuid, Card> = self
            .cards
            .find_by_ids(&card_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let codes: Vec<AvailableCode> = codes
            .into_iter()
            .map(|c| AvailableCode {
                card: cards.get(&c.card_id).map(CardSummary::from),
                id: c.id,
                code: c.code,
                status: c.status,
                exported: c.exported,
                proxy_user_id: c.proxy_user_id,
                created_at: c.created_at,
            })
            .collect();
        let total_count = codes.len();
        Ok(AvailableCodes { codes, total_count })
    }

    /// Flags codes as exported. Proxies can only flag their own codes.
    pub async fn export(&self, code_ids: &[Uuid], user: &User) -> Result<u64, DomainError> {
        user.require_role(&[Role::Admin, Role::Proxy])?;
        if code_ids.is_empty() {
            return Ok(0);
        }
        let scope = if user.is_proxy() { Some(user.id) } else { None };
        let updated = self.codes.mark_exported(code_ids, scope).await?;
        info!("{} marked {} codes as exported", user.username, updated);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;

    fn service(fx: &Fixture) -> ActivationCodeService {
        ActivationCodeService::new(fx.db.clone(), fx.db.clone(), fx.db.clone(), fx.db.clone())
    }

    #[tokio::test]
    async fn test_generate_bounds_and_targets() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(matches!(svc.generate(&fx.card.id, 0, None).await, Err(DomainError::ValidationError(_))));
        assert!(matches!(svc.generate(&fx.card.id, 1001, None).await, Err(DomainError::ValidationError(_))));
        assert!(matches!(svc.generate(&Uuid::new_v4(), 1, None).await, Err(DomainError::CardNotFound)));
        assert!(matches!(
            svc.generate(&fx.card.id, 1, Some(fx.staff.id)).await,
            Err(DomainError::ValidationError(_))
        ));

        let codes = svc.generate(&fx.card.id, 25, Some(fx.proxy.id)).await.unwrap();
        assert_eq!(codes.len(), 25);
        assert!(codes.iter().all(|c| c.is_available() && c.proxy_user_id == Some(fx.proxy.id)));
        assert_eq!(svc.count_by_card(&fx.card.id, true).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_check_reveals_channel_only_when_available() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let code = fx.codes[0].code.clone();

        let check = svc.check(&code.to_lowercase()).await.unwrap();
        assert_eq!(check, CodeCheck { available: true, channel_id: Some(fx.channel.id) });

        svc.set_consuming(&code).await.unwrap();
        assert_eq!(svc.check(&code).await.unwrap(), CodeCheck::unavailable());
        assert_eq!(svc.check("garbage").await.unwrap(), CodeCheck::unavailable());
        assert_eq!(svc.check("ABCD-EFGH-JKLM-NPQR").await.unwrap(), CodeCheck::unavailable());
    }

    #[tokio::test]
    async fn test_transitions_are_guarded() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let code = fx.codes[0].code.clone();

        assert!(matches!(svc.set_consumed(&code).await, Err(DomainError::InvalidCodeStatus(_))));
        svc.set_consuming(&code).await.unwrap();
        assert!(matches!(svc.set_consuming(&code).await, Err(DomainError::InvalidCodeStatus(_))));

        let consumed = svc.set_consumed(&code).await.unwrap();
        assert_eq!(consumed.status, CodeStatus::Consumed);
        assert!(consumed.used_at.is_some());

        assert!(matches!(
            svc.set_consuming("ZZZZ-ZZZZ-ZZZZ-ZZZZ").await,
            Err(DomainError::ActivationCodeNotFound)
        ));
    }

    #[tokio::test]
    async fn test_check_for_user_respects_staff_channel() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let code = &fx.codes[0].code;

        assert!(svc.check_for_user(code, &fx.staff).await.unwrap());
        assert!(!svc.check_for_user(code, &fx.other_staff).await.unwrap());
        assert!(svc.check_for_user(code, &fx.customer).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_card_filters() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        svc.set_consuming(&fx.codes[4].code).await.unwrap();

        let unused = svc.list_by_card(&fx.card.id, &CodeFilter::default()).await.unwrap();
        assert_eq!(unused.len(), 4);

        let all = CodeFilter { include_used: true, ..Default::default() };
        assert_eq!(svc.list_by_card(&fx.card.id, &all).await.unwrap().len(), 5);

        let by_proxy = CodeFilter { proxy_user_id: Some(fx.proxy.id), ..Default::default() };
        assert_eq!(svc.list_by_card(&fx.card.id, &by_proxy).await.unwrap().len(), 2);

        let consuming = CodeFilter { status: Some(CodeStatus::Consuming), ..Default::default() };
        assert_eq!(svc.list_by_card(&fx.card.id, &consuming).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_available_scopes_by_role() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let admin = svc.available_for(&fx.admin).await.unwrap();
        assert_eq!(admin.total_count, 7);

        let proxy = svc.available_for(&fx.proxy).await.unwrap();
        assert_eq!(proxy.total_count, 2);
        assert!(proxy.codes.iter().all(|c| c.card.as_ref().is_some_and(|s| s.price == 10.0)));

        assert!(matches!(svc.available_for(&fx.staff).await, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_proxy_exports_only_own_codes() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let ids: Vec<Uuid> = fx.codes.iter().map(|c| c.id).collect();

        assert_eq!(svc.export(&ids, &fx.proxy).await.unwrap(), 2);
        assert_eq!(svc.export(&ids, &fx.admin).await.unwrap(), 5);
        assert!(matches!(svc.export(&ids, &fx.customer).await, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_stock_excludes_started_codes() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        svc.set_consuming(&fx.codes[0].code).await.unwrap();
        assert_eq!(svc.stock(&fx.card.id).await.unwrap(), 4);
        assert_eq!(svc.stock(&fx.other_card.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_by_card() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        assert_eq!(svc.delete_by_card(&fx.card.id).await.unwrap(), 5);
        assert_eq!(svc.count_by_card(&fx.card.id, false).await.unwrap(), 0);
    }
}
