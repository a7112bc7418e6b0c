//! Profile self-service and administrator account management

use std::sync::Arc;

use kami_security::PasswordService;
use kami_shared::utils::normalize_email;
use kami_shared::Pagination;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{Role, User, UserStatus};
use crate::error::DomainError;
use crate::repositories::{ChannelRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Role,
    pub channel_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub channel_id: Option<Uuid>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total_count: i64,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    channels: Arc<dyn ChannelRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, channels: Arc<dyn ChannelRepository>) -> Self {
        Self { users, channels }
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> Result<(), DomainError> {
        match self.users.find_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(DomainError::EmailAlreadyExists(email.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_channel(&self, channel_id: &Uuid) -> Result<(), DomainError> {
        self.channels
            .find_by_id(channel_id)
            .await?
            .map(|_| ())
            .ok_or(DomainError::ChannelNotFound)
    }

    pub async fn update_profile(&self, user: &User, changes: ProfileChanges) -> Result<User, DomainError> {
        let mut updated = user.clone();
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            self.ensure_email_free(&email, Some(user.id)).await?;
            updated.email = email;
        }
        if let Some(name) = changes.name {
            updated.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        }
        updated.validate()?;
        updated.touch();
        self.users.update(&updated).await
    }

    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        if !PasswordService::verify(old_password, &user.password_hash)? {
            warn!("Password change rejected for {}: old password mismatch", user.username);
            return Err(DomainError::InvalidCredentials);
        }
        PasswordService::check_length(new_password)?;

        let mut updated = user.clone();
        updated.password_hash = PasswordService::hash(new_password)?;
        updated.touch();
        self.users.update(&updated).await?;
        info!("Password changed for {}", user.username);
        Ok(())
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        if self.users.find_by_username(new_user.username.trim()).await?.is_some() {
            return Err(DomainError::UsernameAlreadyExists(new_user.username));
        }
        let email = normalize_email(&new_user.email);
        self.ensure_email_free(&email, None).await?;

        if new_user.role == Role::Staff {
            if let Some(channel_id) = &new_user.channel_id {
                self.ensure_channel(channel_id).await?;
            }
        }
        PasswordService::check_length(&new_user.password)?;

        let user = User::new(
            new_user.username,
            email,
            new_user.name,
            PasswordService::hash(&new_user.password)?,
            new_user.role,
            new_user.channel_id,
        )?;
        let created = self.users.create(&user).await?;
        info!("User '{}' created with role {}", created.username, created.role.as_str());
        Ok(created)
    }

    pub async fn update_user(&self, id: &Uuid, changes: UserChanges) -> Result<User, DomainError> {
        let mut user = self.get_user(id).await?;

        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            self.ensure_email_free(&email, Some(user.id)).await?;
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(status) = changes.status {
            user.status = status;
        }
        if let Some(channel_id) = changes.channel_id {
            self.ensure_channel(&channel_id).await?;
            user.channel_id = Some(channel_id);
        }
        if user.role != Role::Staff {
            user.channel_id = None;
        }
        if let Some(password) = changes.password {
            PasswordService::check_length(&password)?;
            user.password_hash = PasswordService::hash(&password)?;
        }

        user.validate()?;
        user.touch();
        self.users.update(&user).await
    }

    pub async fn list_users(&self, role: Option<Role>, page: Pagination) -> Result<UserPage, DomainError> {
        let users = self.users.list(role, page).await?;
        let total_count = self.users.count(role).await?;
        Ok(UserPage { users, total_count })
    }

    pub async fn get_user(&self, id: &Uuid) -> Result<User, DomainError> {
        self.users.find_by_id(id).await?.ok_or(DomainError::UserNotFound)
    }

    pub async fn delete_user(&self, id: &Uuid) -> Result<(), DomainError> {
        let user = self.get_user(id).await?;
        if user.is_admin() {
            return Err(DomainError::CannotDeleteAdmin);
        }
        self.users.delete(id).await?;
        info!("User '{}' deleted", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Fixture, FIXTURE_PASSWORD};

    fn service(fx: &Fixture) -> UserService {
        UserService::new(fx.db.clone(), fx.db.clone())
    }

    fn staff_user(channel_id: Option<Uuid>) -> NewUser {
        NewUser {
            username: "staff-3".into(),
            email: "staff-3@example.com".into(),
            password: "secret-pass".into(),
            name: None,
            role: Role::Staff,
            channel_id,
        }
    }

    #[tokio::test]
    async fn test_create_staff_requires_existing_channel() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(matches!(
            svc.create_user(staff_user(Some(Uuid::new_v4()))).await,
            Err(DomainError::ChannelNotFound)
        ));

        let created = svc.create_user(staff_user(Some(fx.channel.id))).await.unwrap();
        assert_eq!(created.staff_channel(), Some(fx.channel.id));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let mut dup_name = staff_user(None);
        dup_name.username = "staff-1".into();
        assert!(matches!(svc.create_user(dup_name).await, Err(DomainError::UsernameAlreadyExists(_))));

        let mut dup_email = staff_user(None);
        dup_email.email = "STAFF-1@example.com".into();
        assert!(matches!(svc.create_user(dup_email).await, Err(DomainError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_user_role_clears_channel() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let updated = svc
            .update_user(&fx.staff.id, UserChanges { role: Some(Role::User), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.role, Role::User);
        assert_eq!(updated.channel_id, None);
    }

    #[tokio::test]
    async fn test_admin_cannot_be_deleted() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(matches!(svc.delete_user(&fx.admin.id).await, Err(DomainError::CannotDeleteAdmin)));
        svc.delete_user(&fx.customer.id).await.unwrap();
        assert!(matches!(svc.get_user(&fx.customer.id).await, Err(DomainError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_list_users_by_role() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let staff = svc.list_users(Some(Role::Staff), Pagination::default()).await.unwrap();
        assert_eq!(staff.total_count, 2);
        assert_eq!(staff.users.len(), 2);

        let page = svc.list_users(None, Pagination::new(2, 2)).await.unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.users.len(), 2);
    }

    #[tokio::test]
    async fn test_profile_email_must_be_unique() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        let clash = ProfileChanges { email: Some("admin@example.com".into()), ..Default::default() };
        assert!(matches!(
            svc.update_profile(&fx.customer, clash).await,
            Err(DomainError::EmailAlreadyExists(_))
        ));

        let own = ProfileChanges { email: Some("customer@example.com".into()), name: Some("Cus".into()) };
        let updated = svc.update_profile(&fx.customer, own).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("Cus"));
    }

    #[tokio::test]
    async fn test_change_password_checks_old() {
        let fx = Fixture::new().await;
        let svc = service(&fx);

        assert!(matches!(
            svc.change_password(&fx.customer, "nope-nope", "new-password").await,
            Err(DomainError::InvalidCredentials)
        ));
        svc.change_password(&fx.customer, FIXTURE_PASSWORD, "new-password").await.unwrap();

        let stored = svc.get_user(&fx.customer.id).await.unwrap();
        assert!(PasswordService::verify("new-password", &stored.password_hash).unwrap());
    }
}
