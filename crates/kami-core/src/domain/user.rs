// ============================================================================
// Kami Core - User Entity
// File: crates/kami-core/src/domain/user.rs
// Description: Platform accounts and their roles
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Proxy,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Proxy => "proxy",
            Role::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            "proxy" => Some(Role::Proxy),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(UserStatus::Active),
            "disabled" => Some(UserStatus::Disabled),
            _ => None,
        }
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    pub id: Uuid,

    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 100, message = "Name too long"))]
    pub name: Option<String>,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,
    pub status: UserStatus,

    /// Only meaningful for staff: the channel whose orders they fulfil.
    pub channel_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        name: Option<String>,
        password_hash: String,
        role: Role,
        channel_id: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        let user = Self {
            id: Uuid::new_v4(),
            username: username.trim().to_string(),
            email: kami_shared::utils::normalize_email(&email),
            name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            password_hash,
            role,
            status: UserStatus::Active,
            channel_id: if role == Role::Staff { channel_id } else { None },
            created_at: Utc::now(),
            modified_at: None,
        };

        user.validate()?;
        Ok(user)
    }

    pub fn can_login(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    pub fn is_proxy(&self) -> bool {
        self.role == Role::Proxy
    }

    /// Channel a staff member is scoped to. `None` for every other role.
    pub fn staff_channel(&self) -> Option<Uuid> {
        if self.is_staff() {
            self.channel_id
        } else {
            None
        }
    }

    /// Fails with `Forbidden` unless the user holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), DomainError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "role '{}' is not permitted",
                self.role.as_str()
            )))
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }

    pub fn touch(&mut self) {
        self.modified_at = Some(Utc::now());
    }
}
