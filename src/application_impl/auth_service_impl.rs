use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_service: Arc<dyn TokenService>,
    min_username_len: usize,
    max_username_len: usize,
    min_password_len: usize,
    max_password_len: usize,
    max_page_size: u32,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_service: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_service,
            min_username_len: 2,
            max_username_len: 20,
            min_password_len: 6,
            max_password_len: 50,
            max_page_size: 100,
        }
    }

    fn validate_registration(&self, input: &RegisterInput) -> Result<(), AuthError> {
        let username_len = input.username.chars().count();
        if username_len < self.min_username_len || username_len > self.max_username_len {
            return Err(AuthError::Validation(format!(
                "username must be {} to {} characters",
                self.min_username_len, self.max_username_len
            )));
        }
        if !input
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(AuthError::Validation(
                "username may contain letters, digits, dots, dashes and underscores".to_string(),
            ));
        }

        let password_len = input.password.chars().count();
        if password_len < self.min_password_len || password_len > self.max_password_len {
            return Err(AuthError::Validation(format!(
                "password must be {} to {} characters",
                self.min_password_len, self.max_password_len
            )));
        }

        if !looks_like_email(&input.email) {
            return Err(AuthError::Validation("email is not valid".to_string()));
        }
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<UserRecord, AuthError> {
        self.validate_registration(&request)?;
        let RegisterInput {
            email,
            username,
            password,
        } = request;

        if self.user_repo.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user = self
            .user_repo
            .create(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.user_id, "user registered");
        Ok(user)
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;

        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            debug!(user_id = %user.user_id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.token_service.issue_pair(user.user_id).await?;
        Ok(LoginResult {
            user_id: user.user_id,
            tokens,
        })
    }

    async fn me(&self, user_id: UserId) -> Result<UserRecord, AuthError> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn list_users(&self, page: PageRequest) -> Result<Vec<UserRecord>, AuthError> {
        if page.page == 0 {
            return Err(AuthError::Validation("page starts at 1".to_string()));
        }
        if page.limit == 0 || page.limit > self.max_page_size {
            return Err(AuthError::Validation(format!(
                "limit must be 1 to {}",
                self.max_page_size
            )));
        }
        let offset = (page.page - 1).saturating_mul(page.limit);
        self.user_repo.list(page.limit, offset).await
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        self.token_service.revoke_all(user_id).await?;
        Ok(())
    }

    async fn refresh(
        &self,
        old_access: Option<&str>,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let tokens = self
            .token_service
            .rotate(old_access.unwrap_or_default(), refresh_token)
            .await?;
        Ok(tokens)
    }
}
