// ============================================================================
// Kami Core - Card Service
// File: crates/kami-core/src/services/card_service.rs
// ============================================================================
//! Card catalogue with channel-scoped visibility for staff

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Card, CardChanges, User};
use crate::error::DomainError;
use crate::repositories::{ActivationCodeRepository, CardFilter, CardRepository, ChannelRepository};

#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub channel_id: Uuid,
}

pub struct CardService {
    cards: Arc<dyn CardRepository>,
    channels: Arc<dyn ChannelRepository>,
    codes: Arc<dyn ActivationCodeRepository>,
}

impl CardService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        channels: Arc<dyn ChannelRepository>,
        codes: Arc<dyn ActivationCodeRepository>,
    ) -> Self {
        Self { cards, channels, codes }
    }

    async fn ensure_channel(&self, channel_id: &Uuid) -> Result<(), DomainError> {
        match self.channels.find_by_id(channel_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::ChannelNotFound),
        }
    }

    pub async fn create(&self, new_card: NewCard) -> Result<Card, DomainError> {
        let card = Card::new(new_card.name, new_card.description, new_card.price, new_card.channel_id)?;
        if self.cards.find_by_name(&card.name).await?.is_some() {
            return Err(DomainError::CardNameAlreadyExists(card.name));
        }
        self.ensure_channel(&card.channel_id).await?;
        let created = self.cards.create(&card).await?;
        info!("Card '{}' created in channel {}", created.name, created.channel_id);
        Ok(created)
    }

    /// Staff only ever see their own channel's cards; staff without a
    /// channel see nothing.
    pub async fn list(&self, actor: &User, include_inactive: bool) -> Result<Vec<Card>, DomainError> {
        let channel_id = if actor.is_staff() {
            match actor.staff_channel() {
                Some(channel) => Some(channel),
                None => return Ok(Vec::new()),
            }
        } else {
            None
        };
        self.cards.list(CardFilter { channel_id, include_inactive }).await
    }

    pub async fn get(&self, actor: &User, id: &Uuid) -> Result<Card, DomainError> {
        let card = self.find(id).await?;
        if actor.is_staff() && actor.staff_channel() != Some(card.channel_id) {
            warn!("Staff {} denied access to card {}", actor.username, card.id);
            return Err(DomainError::Forbidden("card belongs to another channel".to_string()));
        }
        Ok(card)
    }

    pub async fn find(&self, id: &Uuid) -> Result<Card, DomainError> {
        self.cards.find_by_id(id).await?.ok_or(DomainError::CardNotFound)
    }

    pub async fn update(&self, id: &Uuid, changes: CardChanges) -> Result<Card, DomainError> {
        let mut card = self.find(id).await?;
        if let Some(name) = changes.name.as_deref().map(str::trim) {
            if let Some(existing) = self.cards.find_by_name(name).await? {
                if existing.id != card.id {
                    return Err(DomainError::CardNameAlreadyExists(name.to_string()));
                }
            }
        }
        if let Some(channel_id) = &changes.channel_id {
            self.ensure_channel(channel_id).await?;
        }
        card.apply(changes)?;
        self.cards.update(&card).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        if !self.cards.delete(id).await? {
            return Err(DomainError::CardNotFound);
        }
        info!("Card {} deleted", id);
        Ok(())
    }

    /// Number of codes still available and unsold.
    pub async fn stock(&self, id: &Uuid) -> Result<i64, DomainError> {
        let card = self.find(id).await?;
        self.codes.count_stock(Some(card.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;

    fn service(fx: &Fixture) -> CardService {
        CardService::new(fx.db.clone(), fx.db.clone(), fx.db.clone())
    }

    #[tokio::test]
    async fn test_staff_see_only_their_channel() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let admin_view = svc.list(&fx.admin, false).await.unwrap();
        assert_eq!(admin_view.len(), 2);

        let staff_view = svc.list(&fx.staff, false).await.unwrap();
        assert_eq!(staff_view.len(), 1);
        assert_eq!(staff_view[0].id, fx.card.id);

        let mut unassigned = fx.staff.clone();
        unassigned.channel_id = None;
        assert!(svc.list(&unassigned, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_cards_hidden_by_default() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        svc.update(&fx.other_card.id, CardChanges { is_active: Some(false), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(svc.list(&fx.admin, false).await.unwrap().len(), 1);
        assert_eq!(svc.list(&fx.admin, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_enforces_channel_for_staff() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(svc.get(&fx.staff, &fx.card.id).await.is_ok());
        assert!(matches!(
            svc.get(&fx.staff, &fx.other_card.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(svc.get(&fx.customer, &fx.other_card.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_validates_name_and_channel() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let dup = NewCard {
            name: "Card A".into(),
            description: "d".into(),
            price: 1.0,
            channel_id: fx.channel.id,
        };
        assert!(matches!(svc.create(dup).await, Err(DomainError::CardNameAlreadyExists(_))));

        let orphan = NewCard {
            name: "Card C".into(),
            description: "d".into(),
            price: 1.0,
            channel_id: Uuid::new_v4(),
        };
        assert!(matches!(svc.create(orphan).await, Err(DomainError::ChannelNotFound)));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_name() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        let rename = CardChanges { name: Some("Card B".into()), ..Default::default() };
        assert!(matches!(
            svc.update(&fx.card.id, rename).await,
            Err(DomainError::CardNameAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_stock_counts_available_codes() {
        let fx = Fixture::new().await;
        let svc = service(&fx);
        assert_eq!(svc.stock(&fx.card.id).await.unwrap(), 5);
        assert!(matches!(svc.stock(&Uuid::new_v4()).await, Err(DomainError::CardNotFound)));
    }
}
