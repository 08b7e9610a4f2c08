use crate::application_port::{AuthError, CredentialHasher};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Argon2id with default parameters. Hashing runs on the blocking pool so a
/// login burst does not stall the request executor.
#[derive(Debug, Default)]
pub struct Argon2PasswordHasher;

fn hash_blocking(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .to_string();
    Ok(hash)
}

fn verify_blocking(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::InternalError(format!("verify error: {}", e))),
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        tokio::task::spawn_blocking(move || verify_blocking(&password, &password_hash))
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_verifies_only_the_original_password() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash_password("123123").await.unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify_password("123123", &hash).await.unwrap());
        assert!(!hasher.verify_password("321321", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_distinct_salts() {
        let hasher = Argon2PasswordHasher;
        let a = hasher.hash_password("secret").await.unwrap();
        let b = hasher.hash_password("secret").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error() {
        let hasher = Argon2PasswordHasher;
        let result = hasher.verify_password("secret", "not-a-phc-string").await;
        assert!(matches!(result, Err(AuthError::InternalError(_))));
    }
}
