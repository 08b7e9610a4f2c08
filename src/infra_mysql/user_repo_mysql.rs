use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let store = |e: sqlx::Error| AuthError::Store(e.to_string());

        let user_id: i64 = row.try_get("id").map_err(store)?;
        let username: String = row.try_get("username").map_err(store)?;
        let email: String = row.try_get("email").map_err(store)?;
        let password_hash: String = row.try_get("password").map_err(store)?;
        let is_superuser: bool = row.try_get("is_superuser").map_err(store)?;
        let is_staff: bool = row.try_get("is_staff").map_err(store)?;
        let created_at: DateTime<Utc> = row.try_get("created_time").map_err(store)?;
        let updated_at: Option<DateTime<Utc>> = row.try_get("updated_time").map_err(store)?;

        Ok(UserRecord {
            user_id: UserId(user_id),
            username,
            email,
            password_hash,
            is_superuser,
            is_staff,
            created_at,
            updated_at,
        })
    }
}

const SELECT_USER: &str = r#"
SELECT id, username, email, password, is_superuser, is_staff, created_time, updated_time
FROM users
"#;

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO users (username, email, password)
VALUES (?, ?, ?)
"#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::UserExists
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        let user_id = UserId(result.last_insert_id() as i64);
        self.get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Store(format!("inserted user {} vanished", user_id)))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("query user: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, AuthError> {
        let rows: Vec<MySqlRow> =
            sqlx::query(&format!("{SELECT_USER} ORDER BY id DESC LIMIT ? OFFSET ?"))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AuthError::Store(format!("list users: {e}")))?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
