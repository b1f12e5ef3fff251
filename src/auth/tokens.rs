use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::claims::{Claims, Identity, TokenKind};
use super::jwt::JwtKeys;
use super::repo::RevocationRepositoryPtr;
use crate::error::{AppError, AppResult};

/// Issues, verifies and revokes bearer tokens.
///
/// Tokens are self-contained JWTs; the only server-side state is the
/// blacklist of revoked `jti`s consulted on every verification.
#[derive(Clone)]
pub struct TokenService {
    keys: JwtKeys,
    revocations: RevocationRepositoryPtr,
}

impl TokenService {
    pub fn new(keys: JwtKeys, revocations: RevocationRepositoryPtr) -> Self {
        Self { keys, revocations }
    }

    pub fn issue_access(&self, identity: &Identity) -> AppResult<String> {
        Ok(self.keys.sign(identity, TokenKind::Access)?)
    }

    pub fn issue_refresh(&self, identity: &Identity) -> AppResult<String> {
        Ok(self.keys.sign(identity, TokenKind::Refresh)?)
    }

    /// Decode `token` and require it to be of kind `expected` and not revoked.
    pub async fn verify(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if claims.kind != expected {
            warn!(user_id = %claims.sub, kind = ?claims.kind, expected = ?expected, "wrong token kind");
            return Err(AppError::Unauthorized(match expected {
                TokenKind::Access => "access token required".into(),
                TokenKind::Refresh => "refresh token required".into(),
            }));
        }
        if self.revocations.is_revoked(claims.jti).await? {
            warn!(user_id = %claims.sub, jti = %claims.jti, "revoked token presented");
            return Err(AppError::Unauthorized("token has been revoked".into()));
        }
        Ok(claims)
    }

    /// Blacklist a currently-valid token. Revoking twice is not an error.
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        let claims = self.decode(token)?;
        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp as i64)
            .map_err(|e| anyhow::anyhow!("token exp out of range: {e}"))?;
        self.revocations.revoke(claims.jti, expires_at).await?;
        info!(user_id = %claims.sub, jti = %claims.jti, kind = ?claims.kind, "token revoked");
        Ok(())
    }

    /// Mint a new access token from a valid refresh token. The refresh token
    /// stays usable until its own expiry.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.verify(refresh_token, TokenKind::Refresh).await?;
        let access = self.issue_access(&claims.identity())?;
        debug!(user_id = %claims.sub, "access token refreshed");
        Ok(access)
    }

    /// Remove blacklist entries for tokens that have expired on their own.
    pub async fn prune_expired(&self) -> anyhow::Result<u64> {
        self.revocations.prune_expired(OffsetDateTime::now_utc()).await
    }

    fn decode(&self, token: &str) -> AppResult<Claims> {
        self.keys.decode(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("invalid or expired token".into())
        })
    }
}
