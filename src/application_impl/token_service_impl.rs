use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_namespace: String,
    pub refresh_namespace: String,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        TokenPolicy {
            access_ttl: Duration::from_secs(24 * 60 * 60),       // 1 day
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            access_namespace: "fba_token".to_string(),
            refresh_namespace: "fba_refresh_token".to_string(),
        }
    }
}

impl TokenPolicy {
    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn namespace(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_namespace,
            TokenKind::Refresh => &self.refresh_namespace,
        }
    }
}

/// Token lifecycle over a signing codec and a revocation cache. A token is
/// honoured only when it decodes, has not expired, and still has its cache
/// entry.
pub struct RealTokenService {
    codec: Arc<dyn TokenCodec>,
    cache: Arc<dyn TokenCache>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl RealTokenService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        cache: Arc<dyn TokenCache>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            codec,
            cache,
            clock,
            policy,
        }
    }

    async fn issue(&self, subject: UserId, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        let ttl = self.policy.ttl(kind);
        let issued = self.codec.encode(subject, ttl)?;
        self.cache
            .put(self.policy.namespace(kind), subject, &issued.token, ttl)
            .await?;
        Ok(issued)
    }

    /// Decode and reject expired claims; the reason is logged but not returned.
    fn live_claims(&self, token: &str, kind: TokenKind) -> Option<ClaimSet> {
        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(?kind, error = %e, "token failed to decode");
                return None;
            }
        };
        if claims.is_expired(self.clock.now()) {
            debug!(?kind, user_id = %claims.subject, "token expired");
            return None;
        }
        Some(claims)
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_pair(&self, subject: UserId) -> Result<TokenPair, TokenError> {
        let access = self.issue(subject, TokenKind::Access).await?;
        let refresh = self.issue(subject, TokenKind::Refresh).await?;
        info!(user_id = %subject, "issued token pair");
        Ok(TokenPair::new(access, refresh))
    }

    async fn verify_access(&self, token: &str) -> Result<UserId, TokenError> {
        let claims = self
            .live_claims(token, TokenKind::Access)
            .ok_or(TokenError::Invalid)?;

        let present = self
            .cache
            .exists(self.policy.namespace(TokenKind::Access), claims.subject, token)
            .await?;
        if !present {
            debug!(user_id = %claims.subject, "access token not in cache");
            return Err(TokenError::Invalid);
        }

        Ok(claims.subject)
    }

    async fn rotate(
        &self,
        old_access: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, TokenError> {
        let claims = self
            .live_claims(refresh_token, TokenKind::Refresh)
            .ok_or(TokenError::Rotation)?;
        let subject = claims.subject;

        // Check-and-consume in one step: of two concurrent rotations only one
        // gets past this point.
        let consumed = self
            .cache
            .take(self.policy.namespace(TokenKind::Refresh), subject, refresh_token)
            .await?;
        if !consumed {
            warn!(user_id = %subject, "refresh token already used or revoked");
            return Err(TokenError::Rotation);
        }

        self.cache
            .delete(self.policy.namespace(TokenKind::Access), subject, old_access)
            .await?;

        let pair = self.issue_pair(subject).await?;
        info!(user_id = %subject, "rotated token pair");
        Ok(pair)
    }

    async fn revoke_all(&self, subject: UserId) -> Result<(), TokenError> {
        let access = self
            .cache
            .delete_all(self.policy.namespace(TokenKind::Access), subject)
            .await?;
        let refresh = self
            .cache
            .delete_all(self.policy.namespace(TokenKind::Refresh), subject)
            .await?;
        info!(user_id = %subject, access, refresh, "revoked all tokens");
        Ok(())
    }
}
