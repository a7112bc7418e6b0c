//! Profile and user administration payloads

use kami_core::domain::{Role, UserStatus};
use kami_core::services::{NewUser, ProfileChanges, UserChanges};
use kami_shared::constants::DEFAULT_PAGE_SIZE;
use kami_shared::Pagination;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 100, message = "Name too long"))]
    pub name: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileChanges { email: req.email, name: req.name }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100, message = "Name too long"))]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub channel_id: Option<Uuid>,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
            name: req.name,
            role: req.role,
            channel_id: req.channel_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 100, message = "Name too long"))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub channel_id: Option<Uuid>,
    pub password: Option<String>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        UserChanges {
            email: req.email,
            name: req.name,
            role: req.role,
            status: req.status,
            channel_id: req.channel_id,
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListUsersQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page.unwrap_or(1), self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}
