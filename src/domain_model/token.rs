use super::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which half of a pair a token belongs to. Kinds share the claim layout and
/// differ only in lifetime and cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verified contents of a token. Decoding never judges expiry; callers ask
/// `is_expired` against their own clock reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub subject: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: String,
}

impl ClaimSet {
    /// A claim set is live strictly before `expires_at`. Both sides are
    /// truncated to whole seconds, matching the `exp` claim's resolution, so a
    /// token may lapse up to a second before its cache entry does.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at.timestamp()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_type: &'static str,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_type: &'static str,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(access: IssuedToken, refresh: IssuedToken) -> Self {
        TokenPair {
            access_token: access.token,
            access_token_type: "Bearer",
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_token_type: "Bearer",
            refresh_token_expires_at: refresh.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_expiring_at(expires_at: DateTime<Utc>) -> ClaimSet {
        ClaimSet {
            subject: UserId(7),
            issued_at: expires_at,
            expires_at,
            token_id: "jti".to_string(),
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let claims = claims_expiring_at(now);
        assert!(claims.is_expired(now));
        assert!(claims.is_expired(now + Duration::seconds(1)));
        assert!(!claims.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn expiry_is_judged_in_whole_seconds() {
        let expires_at = DateTime::<Utc>::from_timestamp_millis(10_900).unwrap();
        let claims = claims_expiring_at(expires_at);
        let same_second = DateTime::<Utc>::from_timestamp_millis(10_100).unwrap();
        let second_before = DateTime::<Utc>::from_timestamp_millis(9_999).unwrap();
        assert!(claims.is_expired(same_second));
        assert!(!claims.is_expired(second_before));
    }
}
