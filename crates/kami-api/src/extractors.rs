// ============================================================================
// Kami API - Authentication Extractors
// File: crates/kami-api/src/extractors.rs
// ============================================================================
//! Bearer authentication and role gates

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use kami_core::domain::{Role, User};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ApiError::Unauthorized("expected a bearer token".to_string())),
    }
}

/// The authenticated, active caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.auth.authenticate(token).await?;
        debug!("Authenticated {} ({})", user.username, user.role.as_str());
        Ok(CurrentUser(user))
    }
}

async fn require(parts: &mut Parts, state: &AppState, roles: &[Role]) -> Result<User, ApiError> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
    user.require_role(roles)?;
    Ok(user)
}

pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, &[Role::Admin]).await.map(RequireAdmin)
    }
}

/// Staff or admin.
pub struct RequireStaff(pub User);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, &[Role::Admin, Role::Staff]).await.map(RequireStaff)
    }
}

pub struct RequireProxyOrAdmin(pub User);

impl FromRequestParts<AppState> for RequireProxyOrAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, &[Role::Admin, Role::Proxy]).await.map(RequireProxyOrAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))).unwrap(), "abc");
        assert!(bearer_token(&parts(Some("Basic abc"))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
        assert!(bearer_token(&parts(None)).is_err());
    }
}
