use anyhow::{Result, anyhow, ensure};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub cache: Cache,
    pub http: Http,
    pub log: Log,
    pub user: User,
}

#[derive(Deserialize)]
pub struct Auth {
    pub signing_key: String,
    pub issuer: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub access_namespace: String,
    pub refresh_namespace: String,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("signing_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("access_namespace", &self.access_namespace)
            .field("refresh_namespace", &self.refresh_namespace)
            .finish()
    }
}

impl Auth {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

#[derive(Deserialize)]
pub struct Cache {
    pub backend: String, // "memory" or "redis"
    pub redis_url: Option<String>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend)
            .field("redis_url", &self.redis_url.as_deref().map(redact_url))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct User {
    pub backend: String, // "memory" or "mysql"
    pub mysql_url: Option<String>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("backend", &self.backend)
            .field("mysql_url", &self.mysql_url.as_deref().map(redact_url))
            .finish()
    }
}

/// Replaces the `user:password@` part of a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://<redacted>@{}", scheme, &rest[at + 1..]),
        None => url.to_string(),
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        ensure!(!auth.signing_key.is_empty(), "auth.signing_key must not be empty");
        ensure!(auth.access_ttl_secs > 0, "auth.access_ttl_secs must be positive");
        ensure!(
            auth.access_ttl_secs < auth.refresh_ttl_secs,
            "auth.access_ttl_secs must be shorter than auth.refresh_ttl_secs"
        );
        ensure!(
            !auth.access_namespace.is_empty() && !auth.refresh_namespace.is_empty(),
            "auth namespaces must not be empty"
        );
        ensure!(
            auth.access_namespace != auth.refresh_namespace,
            "auth.access_namespace and auth.refresh_namespace must differ"
        );
        ensure!(
            self.http.cert_path.is_some() == self.http.key_path.is_some(),
            "http.cert_path and http.key_path must be set together"
        );
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "KEYWARD";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}
