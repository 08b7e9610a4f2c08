use crate::domain_model::UserId;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;

const TOKEN_PUT: &str = include_str!("token_cache_put.lua");
const TOKEN_TAKE: &str = include_str!("token_cache_take.lua");
const TOKEN_DELETE_ALL: &str = include_str!("token_cache_delete_all.lua");

/// Token cache on a shared Redis. Each subject keeps a sorted index of its
/// entry keys, scored by expiry in milliseconds, so revocation never scans the
/// keyspace. `put` prunes members whose entries have already lapsed. The
/// scripts touch keys read from that index, so the cache expects a single
/// (non-cluster) Redis.
pub struct RedisTokenCache {
    conn: ConnectionManager,
    put_script: Script,
    take_script: Script,
    delete_all_script: Script,
}

impl RedisTokenCache {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisTokenCache {
            conn,
            put_script: Script::new(TOKEN_PUT),
            take_script: Script::new(TOKEN_TAKE),
            delete_all_script: Script::new(TOKEN_DELETE_ALL),
        }
    }
}

fn store_err(e: redis::RedisError) -> TokenCacheError {
    TokenCacheError::Store(e.to_string())
}

#[async_trait::async_trait]
impl TokenCache for RedisTokenCache {
    async fn put(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenCacheError> {
        let ttl_secs = ttl.as_secs();
        if ttl_secs == 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: i64 = self
            .put_script
            .key(entry_key(namespace, subject, token))
            .key(subject_index_key(namespace, subject))
            .arg(token)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn exists(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<bool, TokenCacheError> {
        let mut conn = self.conn.clone();
        let val: Option<String> = conn
            .get(entry_key(namespace, subject, token))
            .await
            .map_err(store_err)?;
        Ok(val.as_deref() == Some(token))
    }

    async fn delete(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<(), TokenCacheError> {
        let key = entry_key(namespace, subject, token);
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .zrem(subject_index_key(namespace, subject), &key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn take(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<bool, TokenCacheError> {
        let mut conn = self.conn.clone();
        let status: i64 = self
            .take_script
            .key(entry_key(namespace, subject, token))
            .key(subject_index_key(namespace, subject))
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        match status {
            1 => Ok(true),
            0 => Ok(false),
            other => Err(TokenCacheError::UnexpectedStatus(other)),
        }
    }

    async fn delete_all(&self, namespace: &str, subject: UserId) -> Result<u64, TokenCacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .delete_all_script
            .key(subject_index_key(namespace, subject))
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(removed.max(0) as u64)
    }
}
