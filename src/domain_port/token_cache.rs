use crate::domain_model::UserId;
use std::time::Duration;

/// Registry of outstanding tokens. An entry lives under
/// `{namespace}:{subject}:{token}` and holds the token itself as its value.
#[async_trait::async_trait]
pub trait TokenCache: Send + Sync {
    /// Store `token` for `ttl`. Overwrites are allowed; a zero TTL stores nothing.
    async fn put(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenCacheError>;

    /// True iff the entry is present and its value equals `token`.
    async fn exists(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<bool, TokenCacheError>;

    /// Remove one entry. Removing an absent entry is a no-op.
    async fn delete(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<(), TokenCacheError>;

    /// Atomic compare-and-delete. Among concurrent callers on the same entry
    /// at most one observes `true`.
    async fn take(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<bool, TokenCacheError>;

    /// Remove every entry of `subject` in `namespace`, returning how many live
    /// entries were dropped. Safe to repeat and to race.
    async fn delete_all(&self, namespace: &str, subject: UserId) -> Result<u64, TokenCacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenCacheError {
    #[error("infra error: {0}")]
    Store(String),
    #[error("unexpected script status: {0}")]
    UnexpectedStatus(i64),
}

pub fn entry_key(namespace: &str, subject: UserId, token: &str) -> String {
    format!("{}:{}:{}", namespace, subject, token)
}

/// Per-subject index of entry keys, used by `delete_all` instead of a scan.
pub fn subject_index_key(namespace: &str, subject: UserId) -> String {
    format!("{}:idx:{}", namespace, subject)
}
