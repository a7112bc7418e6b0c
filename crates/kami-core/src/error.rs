//! Domain errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found")]
    UserNotFound,

    #[error("Channel not found")]
    ChannelNotFound,

    #[error("Card not found")]
    CardNotFound,

    #[error("Activation code not found")]
    ActivationCodeNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("User not active")]
    UserNotActive,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Username already exists: {0}")]
    UsernameAlreadyExists(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Channel name already exists: {0}")]
    ChannelNameAlreadyExists(String),

    #[error("Card name already exists: {0}")]
    CardNameAlreadyExists(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid activation code status: {0}")]
    InvalidCodeStatus(String),

    #[error("Activation code does not belong to channel")]
    CodeChannelMismatch,

    #[error("Proxy is not bound to card")]
    ProxyNotBound,

    #[error("Order already completed")]
    OrderAlreadyCompleted,

    #[error("Card out of stock: {0}")]
    OutOfStock(String),

    #[error("Admin users cannot be deleted")]
    CannotDeleteAdmin,

    #[error("Registration is disabled")]
    RegistrationDisabled,

    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,

    #[error("Password too short")]
    PasswordTooShort,

    #[error("Password too long")]
    PasswordTooLong,

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Mail error: {0}")]
    MailError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<kami_security::PasswordError> for DomainError {
    fn from(e: kami_security::PasswordError) -> Self {
        use kami_security::PasswordError;
        match e {
            PasswordError::TooShort => DomainError::PasswordTooShort,
            PasswordError::TooLong => DomainError::PasswordTooLong,
            PasswordError::HashError(msg) => DomainError::PasswordHashError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(e: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(e.to_string())
    }
}
