//! Channel catalogue management

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::Channel;
use crate::error::DomainError;
use crate::repositories::ChannelRepository;

pub struct ChannelService {
    channels: Arc<dyn ChannelRepository>,
}

impl ChannelService {
    pub fn new(channels: Arc<dyn ChannelRepository>) -> Self {
        Self { channels }
    }

    pub async fn create(&self, name: String, description: Option<String>) -> Result<Channel, DomainError> {
        let channel = Channel::new(name, description)?;
        if self.channels.find_by_name(&channel.name).await?.is_some() {
            return Err(DomainError::ChannelNameAlreadyExists(channel.name));
        }
        let created = self.channels.create(&channel).await?;
        info!("Channel '{}' created", created.name);
        Ok(created)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Channel, DomainError> {
        self.channels.find_by_id(id).await?.ok_or(DomainError::ChannelNotFound)
    }

    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Channel>, DomainError> {
        self.channels.list(skip.max(0), limit.clamp(1, 1000)).await
    }

    pub async fn update(
        &self,
        id: &Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Channel, DomainError> {
        let mut channel = self.get(id).await?;
        if let Some(name) = name.as_deref().map(str::trim) {
            if let Some(existing) = self.channels.find_by_name(name).await? {
                if existing.id != channel.id {
                    return Err(DomainError::ChannelNameAlreadyExists(name.to_string()));
                }
            }
        }
        channel.apply(name, description)?;
        self.channels.update(&channel).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        if !self.channels.delete(id).await? {
            return Err(DomainError::ChannelNotFound);
        }
        info!("Channel {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;

    #[tokio::test]
    async fn test_channel_names_are_unique() {
        let fx = Fixture::new().await;
        let svc = ChannelService::new(fx.db.clone());

        assert!(matches!(
            svc.create(" Channel One ".into(), None).await,
            Err(DomainError::ChannelNameAlreadyExists(_))
        ));
        let created = svc.create("Channel Three".into(), None).await.unwrap();

        assert!(matches!(
            svc.update(&created.id, Some("Channel Two".into()), None).await,
            Err(DomainError::ChannelNameAlreadyExists(_))
        ));
        let renamed = svc.update(&created.id, Some("Channel Three".into()), Some("d".into())).await.unwrap();
        assert_eq!(renamed.description.as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let fx = Fixture::new().await;
        let svc = ChannelService::new(fx.db.clone());

        assert_eq!(svc.list(0, 100).await.unwrap().len(), 2);
        assert_eq!(svc.list(1, 100).await.unwrap().len(), 1);

        svc.delete(&fx.other_channel.id).await.unwrap();
        assert!(matches!(svc.delete(&fx.other_channel.id).await, Err(DomainError::ChannelNotFound)));
        assert!(matches!(svc.get(&fx.other_channel.id).await, Err(DomainError::ChannelNotFound)));
    }
}
