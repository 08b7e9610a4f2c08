use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use tokio::sync::RwLock;

/// Process-local user table for development and tests.
#[derive(Debug, Default)]
pub struct MemoryUserRepo {
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(AuthError::UserExists);
        }

        let record = UserRecord {
            user_id: UserId(users.len() as i64 + 1),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_superuser: false,
            is_staff: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, AuthError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@mail.ru", name),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_rejects_duplicates() {
        let repo = MemoryUserRepo::new();
        let a = repo.create(new_user("admin")).await.unwrap();
        let b = repo.create(new_user("guest")).await.unwrap();
        assert_eq!(a.user_id, UserId(1));
        assert_eq!(b.user_id, UserId(2));

        let dup = repo.create(new_user("admin")).await;
        assert!(matches!(dup, Err(AuthError::UserExists)));
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let repo = MemoryUserRepo::new();
        for name in ["u1", "u2", "u3"] {
            repo.create(new_user(name)).await.unwrap();
        }

        let first: Vec<_> = repo.list(2, 0).await.unwrap();
        let names: Vec<_> = first.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["u3", "u2"]);

        let second = repo.list(2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].username, "u1");
    }
}
