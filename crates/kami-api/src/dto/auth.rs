//! Authentication payloads

use kami_core::services::Registration;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendCodeRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100, message = "Name too long"))]
    pub name: Option<String>,
    #[validate(length(equal = 6, message = "Verification code must have 6 digits"))]
    pub code: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            name: req.name,
            code: req.code,
        }
    }
}
