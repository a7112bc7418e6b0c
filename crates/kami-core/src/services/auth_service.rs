// ============================================================================
// Kami Core - Authentication Service
// File: crates/kami-core/src/services/auth_service.rs
// ============================================================================
//! Login, token refresh, bearer authentication and e-mail registration

use std::sync::Arc;
use std::time::Duration;

use kami_security::code::generate_verification_code;
use kami_security::jwt::{JwtError, TokenSubject};
use kami_security::{JwtService, PasswordService};
use kami_shared::constants::TOKEN_TYPE_BEARER;
use kami_shared::utils::{mask_email, normalize_email};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{Role, User};
use crate::error::DomainError;
use crate::repositories::{UserRepository, VerificationCodeStore};
use crate::services::MailService;

/// Whether self-service sign-up is open and how its codes behave.
#[derive(Debug, Clone)]
pub struct RegistrationPolicy {
    pub enabled: bool,
    pub code_ttl: Duration,
    /// Keep the stored code even when the mail could not be delivered.
    pub tolerate_mail_failure: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub code: String,
}

/// Authentication service for login and registration flows
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
    codes: Arc<dyn VerificationCodeStore>,
    mail: Arc<MailService>,
    registration: RegistrationPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        jwt: Arc<JwtService>,
        codes: Arc<dyn VerificationCodeStore>,
        mail: Arc<MailService>,
        registration: RegistrationPolicy,
    ) -> Self {
        Self { users, jwt, codes, mail, registration }
    }

    /// Login with username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthTokens, DomainError> {
        info!("Login attempt for username: {}", username);

        let user = self.users.find_by_username(username.trim()).await?.ok_or_else(|| {
            warn!("Login failed: unknown username: {}", username);
            DomainError::InvalidCredentials
        })?;

        let password_valid = PasswordService::verify(password, &user.password_hash)
            .map_err(|_| DomainError::InvalidCredentials)?;
        if !password_valid {
            warn!("Login failed: invalid password for: {}", username);
            return Err(DomainError::InvalidCredentials);
        }

        if !user.can_login() {
            warn!("Login failed: user {} is {}", username, user.status.as_str());
            return Err(DomainError::UserNotActive);
        }

        let tokens = self.issue(&user)?;
        info!("Login successful for: {}", username);
        Ok(tokens)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, DomainError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(token_error)?;
        let user = self.load_active(&claims.user_id().map_err(token_error)?).await?;
        self.issue(&user)
    }

    /// Resolves a bearer access token to its (still active) user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, DomainError> {
        let claims = self
            .jwt
            .validate_access_token(access_token)
            .map_err(token_error)?;
        self.load_active(&claims.user_id().map_err(token_error)?).await
    }

    async fn load_active(&self, id: &uuid::Uuid) -> Result<User, DomainError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::InvalidToken("unknown user".to_string()))?;
        if !user.can_login() {
            return Err(DomainError::UserNotActive);
        }
        Ok(user)
    }

    fn issue(&self, user: &User) -> Result<AuthTokens, DomainError> {
        let pair = self
            .jwt
            .generate_pair(TokenSubject {
                user_id: &user.id,
                username: &user.username,
                role: user.role.as_str(),
            })
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;
        Ok(AuthTokens {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: TOKEN_TYPE_BEARER,
        })
    }

    pub async fn send_verification_code(&self, email: &str) -> Result<(), DomainError> {
        if !self.registration.enabled {
            return Err(DomainError::RegistrationDisabled);
        }
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::EmailAlreadyExists(email));
        }

        let code = generate_verification_code();
        self.codes.put(&email, &code, self.registration.code_ttl).await?;

        let ttl_minutes = self.registration.code_ttl.as_secs().div_ceil(60);
        if let Err(e) = self.mail.send_verification_code(&email, &code, ttl_minutes).await {
            if self.registration.tolerate_mail_failure {
                warn!("Verification mail to {} failed, code kept: {}", mask_email(&email), e);
            } else {
                error!("Verification mail to {} failed, code discarded: {}", mask_email(&email), e);
                self.codes.remove(&email).await?;
                return Err(e);
            }
        }
        info!("Verification code issued for {}", mask_email(&email));
        Ok(())
    }

    pub async fn register_with_code(&self, registration: Registration) -> Result<User, DomainError> {
        if !self.registration.enabled {
            return Err(DomainError::RegistrationDisabled);
        }
        let email = normalize_email(&registration.email);
        PasswordService::check_length(&registration.password)?;

        if self.users.find_by_username(&registration.username).await?.is_some() {
            return Err(DomainError::UsernameAlreadyExists(registration.username));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::EmailAlreadyExists(email));
        }
        if !self.codes.verify_and_consume(&email, registration.code.trim()).await? {
            warn!("Registration rejected: bad verification code for {}", mask_email(&email));
            return Err(DomainError::InvalidVerificationCode);
        }

        let user = User::new(
            registration.username,
            email,
            registration.name,
            PasswordService::hash(&registration.password)?,
            Role::User,
            None,
        )?;
        let created = self.users.create(&user).await?;
        info!("Registration successful for: {}", created.username);
        Ok(created)
    }

    /// Creates the configured administrator unless the username is taken.
    /// Returns the new account, or `None` when nothing was created.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<User>, DomainError> {
        if self.users.find_by_username(username).await?.is_some() {
            info!("Admin bootstrap skipped: '{}' already exists", username);
            return Ok(None);
        }
        PasswordService::check_length(password)?;
        let admin = User::new(
            username.to_string(),
            email.to_string(),
            Some(name.to_string()),
            PasswordService::hash(password)?,
            Role::Admin,
            None,
        )?;
        let created = self.users.create(&admin).await?;
        info!("Bootstrapped admin account '{}'", created.username);
        Ok(Some(created))
    }
}

fn token_error(e: JwtError) -> DomainError {
    match e {
        JwtError::TokenExpired => DomainError::InvalidToken("token expired".to_string()),
        other => DomainError::InvalidToken(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserStatus;
    use crate::repositories::InMemoryVerificationCodeStore;
    use crate::test_utils::{Fixture, RecordingMailer, FIXTURE_PASSWORD};
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::Fake;

    const SECRET: &str = "unit-test-secret-unit-test-secret";

    fn service(fx: &Fixture, enabled: bool, tolerate: bool) -> AuthService {
        service_with_store(fx, enabled, tolerate, Arc::new(InMemoryVerificationCodeStore::new()))
    }

    fn service_with_store(
        fx: &Fixture,
        enabled: bool,
        tolerate: bool,
        store: Arc<dyn VerificationCodeStore>,
    ) -> AuthService {
        let mail = Arc::new(MailService::new(fx.mailer.clone()).unwrap());
        AuthService::new(
            fx.db.clone(),
            Arc::new(JwtService::new(SECRET, 900, 3600)),
            store,
            mail,
            RegistrationPolicy {
                enabled,
                code_ttl: Duration::from_secs(300),
                tolerate_mail_failure: tolerate,
            },
        )
    }

    /// Remembers the last code handed to the store.
    #[derive(Default)]
    struct KeepLastCode {
        inner: InMemoryVerificationCodeStore,
        last: std::sync::Mutex<Option<String>>,
    }

    impl KeepLastCode {
        fn last(&self) -> String {
            self.last.lock().unwrap().clone().expect("a code was stored")
        }
    }

    #[async_trait::async_trait]
    impl VerificationCodeStore for KeepLastCode {
        async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<(), DomainError> {
            *self.last.lock().unwrap() = Some(code.to_string());
            self.inner.put(email, code, ttl).await
        }

        async fn verify_and_consume(&self, email: &str, code: &str) -> Result<bool, DomainError> {
            self.inner.verify_and_consume(email, code).await
        }

        async fn remove(&self, email: &str) -> Result<(), DomainError> {
            self.inner.remove(email).await
        }
    }

    fn registration(email: &str, code: String) -> Registration {
        Registration {
            username: Username().fake(),
            email: email.to_string(),
            password: "secret-pass".into(),
            name: None,
            code,
        }
    }

    fn code_from(mailer: &RecordingMailer) -> String {
        let mail = mailer.sent().pop().expect("verification mail");
        mail.text_body
            .split_whitespace()
            .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
            .expect("code in body")
            .to_string()
    }

    #[tokio::test]
    async fn test_login_and_authenticate() {
        let fx = Fixture::new().await;
        let auth = service(&fx, false, false);

        let tokens = auth.login("staff-1", FIXTURE_PASSWORD).await.unwrap();
        assert_eq!(tokens.token_type, "bearer");

        let user = auth.authenticate(&tokens.access_token).await.unwrap();
        assert_eq!(user.id, fx.staff.id);

        assert!(matches!(
            auth.authenticate(&tokens.refresh_token).await,
            Err(DomainError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let fx = Fixture::new().await;
        let auth = service(&fx, false, false);

        assert!(matches!(
            auth.login("staff-1", "wrong-password").await,
            Err(DomainError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", FIXTURE_PASSWORD).await,
            Err(DomainError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_disabled_user_cannot_login_or_use_tokens() {
        let fx = Fixture::new().await;
        let auth = service(&fx, false, false);
        let tokens = auth.login("customer", FIXTURE_PASSWORD).await.unwrap();

        let mut disabled = fx.customer.clone();
        disabled.status = UserStatus::Disabled;
        UserRepository::update(fx.db.as_ref(), &disabled).await.unwrap();

        assert!(matches!(
            auth.login("customer", FIXTURE_PASSWORD).await,
            Err(DomainError::UserNotActive)
        ));
        assert!(matches!(
            auth.authenticate(&tokens.access_token).await,
            Err(DomainError::UserNotActive)
        ));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_pair() {
        let fx = Fixture::new().await;
        let auth = service(&fx, false, false);
        let tokens = auth.login("proxy-1", FIXTURE_PASSWORD).await.unwrap();

        let refreshed = auth.refresh(&tokens.refresh_token).await.unwrap();
        let user = auth.authenticate(&refreshed.access_token).await.unwrap();
        assert_eq!(user.id, fx.proxy.id);

        assert!(auth.refresh(&tokens.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_registration_disabled() {
        let fx = Fixture::new().await;
        let auth = service(&fx, false, false);
        assert!(matches!(
            auth.send_verification_code("new@example.com").await,
            Err(DomainError::RegistrationDisabled)
        ));
    }

    #[tokio::test]
    async fn test_register_with_code() {
        let fx = Fixture::new().await;
        let auth = service(&fx, true, false);
        let email: String = SafeEmail().fake();
        let username: String = Username().fake();

        auth.send_verification_code(&email).await.unwrap();
        let code = code_from(&fx.mailer);
        let wrong = if code == "000000" { "111111" } else { "000000" };

        let bad = auth
            .register_with_code(Registration {
                username: username.clone(),
                email: email.clone(),
                password: "secret-pass".into(),
                name: None,
                code: wrong.into(),
            })
            .await;
        assert!(matches!(bad, Err(DomainError::InvalidVerificationCode)));

        let user = auth
            .register_with_code(Registration {
                username,
                email: email.clone(),
                password: "secret-pass".into(),
                name: None,
                code,
            })
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(matches!(
            auth.send_verification_code(&email).await,
            Err(DomainError::EmailAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_mail_failure_policy() {
        let fx = Fixture::new().await;
        fx.mailer.set_failing(true);

        let strict = service(&fx, true, false);
        assert!(matches!(
            strict.send_verification_code("a@example.org").await,
            Err(DomainError::MailError(_))
        ));

        let lenient = service(&fx, true, true);
        assert!(lenient.send_verification_code("a@example.org").await.is_ok());
    }

    #[tokio::test]
    async fn test_undelivered_code_is_discarded_unless_tolerated() {
        let fx = Fixture::new().await;
        fx.mailer.set_failing(true);

        let store = Arc::new(KeepLastCode::default());
        let strict = service_with_store(&fx, true, false, store.clone());
        assert!(strict.send_verification_code("strict@example.org").await.is_err());
        assert!(matches!(
            strict.register_with_code(registration("strict@example.org", store.last())).await,
            Err(DomainError::InvalidVerificationCode)
        ));

        let store = Arc::new(KeepLastCode::default());
        let lenient = service_with_store(&fx, true, true, store.clone());
        lenient.send_verification_code("lenient@example.org").await.unwrap();
        let user = lenient
            .register_with_code(registration("lenient@example.org", store.last()))
            .await
            .unwrap();
        assert_eq!(user.email, "lenient@example.org");
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let fx = Fixture::new().await;
        let auth = service(&fx, false, false);

        let created = auth
            .bootstrap_admin("root", "root@example.com", "root-password", "Root")
            .await
            .unwrap();
        assert_eq!(created.map(|u| u.role), Some(Role::Admin));

        let again = auth
            .bootstrap_admin("root", "root@example.com", "root-password", "Root")
            .await
            .unwrap();
        assert!(again.is_none());
        assert!(auth.login("root", "root-password").await.is_ok());
    }
}
