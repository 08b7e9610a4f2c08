use crate::application_impl::*;
use crate::application_port::*;
use crate::auth::AuthGate;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{Context, anyhow};
use sqlx::MySqlPool;
use std::sync::Arc;

/// Long-lived service graph shared by every request.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub token_service: Arc<dyn TokenService>,
    pub auth_gate: AuthGate,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let token_cache: Arc<dyn TokenCache> = match settings.cache.backend.as_str() {
            "memory" => Arc::new(MemoryTokenCache::new(clock.clone())),
            "redis" => {
                let url = settings
                    .cache
                    .redis_url
                    .as_deref()
                    .context("cache.redis_url is required for the redis backend")?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                info!("token cache: redis");
                Arc::new(RedisTokenCache::new(redis_manager))
            }
            other => return Err(anyhow!("Unknown cache backend: {}", other)),
        };

        let user_repo: Arc<dyn UserRepo> = match settings.user.backend.as_str() {
            "memory" => Arc::new(MemoryUserRepo::new()),
            "mysql" => {
                let url = settings
                    .user
                    .mysql_url
                    .as_deref()
                    .context("user.mysql_url is required for the mysql backend")?;
                let pool = MySqlPool::connect(url).await?;
                info!("user store: mysql");
                Arc::new(MySqlUserRepo::new(pool))
            }
            other => return Err(anyhow!("Unknown user backend: {}", other)),
        };

        Ok(Self::from_parts(settings, clock, token_cache, user_repo))
    }

    pub fn from_parts(
        settings: &Settings,
        clock: Arc<dyn Clock>,
        token_cache: Arc<dyn TokenCache>,
        user_repo: Arc<dyn UserRepo>,
    ) -> Self {
        let auth = &settings.auth;
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: auth.issuer.clone(),
                signing_key: auth.signing_key.clone().into_bytes(),
            },
            clock.clone(),
        ));
        let policy = TokenPolicy {
            access_ttl: auth.access_ttl(),
            refresh_ttl: auth.refresh_ttl(),
            access_namespace: auth.access_namespace.clone(),
            refresh_namespace: auth.refresh_namespace.clone(),
        };
        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            token_codec,
            token_cache,
            clock,
            policy,
        ));

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo,
            credential_hasher,
            token_service.clone(),
        ));

        Server {
            auth_gate: AuthGate::new(token_service.clone()),
            auth_service,
            token_service,
        }
    }
}
