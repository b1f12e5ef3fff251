use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use super::tokens::TokenService;
use crate::error::AppError;

/// Raw token from an `Authorization: Bearer <token>` header, unverified.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))?;

        Ok(BearerToken(token.to_string()))
    }
}

/// Caller authenticated by a valid, unrevoked access token.
pub struct AuthUser {
    pub claims: Claims,
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.claims.sub
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let tokens = TokenService::from_ref(state);
        let claims = tokens.verify(&token, TokenKind::Access).await?;
        Ok(AuthUser { claims, token })
    }
}
