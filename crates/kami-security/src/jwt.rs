//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use kami_shared::constants::{TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Unexpected token type: {0}")]
    WrongTokenType(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::ValidationError(e.to_string()))
    }
}

/// Identity embedded into issued tokens.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: &'a Uuid,
    pub username: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expiry: i64, refresh_expiry: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry: access_expiry,
            refresh_token_expiry: refresh_expiry,
        }
    }

    pub fn generate_pair(&self, subject: TokenSubject<'_>) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.generate_token(subject, TOKEN_TYPE_ACCESS, self.access_token_expiry)?,
            refresh_token: self.generate_token(
                subject,
                TOKEN_TYPE_REFRESH,
                self.refresh_token_expiry,
            )?,
        })
    }

    fn generate_token(
        &self,
        subject: TokenSubject<'_>,
        token_type: &str,
        expiry: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.user_id.to_string(),
            username: subject.username.to_string(),
            role: subject.role.to_string(),
            token_type: token_type.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::ValidationError(e.to_string()),
            })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_typed(token, TOKEN_TYPE_ACCESS)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_typed(token, TOKEN_TYPE_REFRESH)
    }

    fn validate_typed(&self, token: &str, expected: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType(claims.token_type));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret";

    fn subject(id: &Uuid) -> TokenSubject<'_> {
        TokenSubject { user_id: id, username: "staff-1", role: "staff" }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let svc = JwtService::new(SECRET, 900, 3600);
        let id = Uuid::new_v4();
        let pair = svc.generate_pair(subject(&id)).unwrap();

        let claims = svc.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.username, "staff-1");
        assert_eq!(claims.role, "staff");
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let svc = JwtService::new(SECRET, 900, 3600);
        let id = Uuid::new_v4();
        let pair = svc.generate_pair(subject(&id)).unwrap();

        assert!(matches!(
            svc.validate_access_token(&pair.refresh_token),
            Err(JwtError::WrongTokenType(_))
        ));
        assert!(svc.validate_refresh_token(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_expired_token() {
        let svc = JwtService::new(SECRET, -600, -600);
        let id = Uuid::new_v4();
        let pair = svc.generate_pair(subject(&id)).unwrap();
        assert!(matches!(svc.validate_access_token(&pair.access_token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let issuer = JwtService::new(SECRET, 900, 3600);
        let other = JwtService::new("another-secret-another-secret-xx", 900, 3600);
        let id = Uuid::new_v4();
        let pair = issuer.generate_pair(subject(&id)).unwrap();
        assert!(matches!(other.validate_token(&pair.access_token), Err(JwtError::ValidationError(_))));
    }
}
