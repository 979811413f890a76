use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Pagination, User, UserFilter};

/// Repository trait for User persistence.
///
/// Lookups return `Ok(None)` for a missing row; mutations of a missing row
/// return [`UserError::NotFound`]. Email and nickname uniqueness is enforced
/// here as well as in the service pre-check, and a violation surfaces as
/// [`UserError::EmailExists`] / [`UserError::NicknameExists`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>>;

    /// Persist every profile field except the password
    async fn update(&self, user: User) -> UserResult<User>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
        updated_at: DateTime<Utc>,
    ) -> UserResult<()>;

    async fn delete(&self, id: Uuid) -> UserResult<()>;

    /// One page ordered by `created_at` descending, plus the total match count
    async fn list(&self, filter: UserFilter, pagination: Pagination)
    -> UserResult<(Vec<User>, u64)>;

    async fn health_check(&self) -> UserResult<()>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same arbitration order as the unique constraints: email, then nickname
    fn check_unique(users: &HashMap<Uuid, User>, candidate: &User) -> UserResult<()> {
        let others = || users.values().filter(|u| u.id != candidate.id);

        if others().any(|u| u.email == candidate.email) {
            return Err(UserError::EmailExists);
        }
        if others().any(|u| u.nickname == candidate.nickname) {
            return Err(UserError::NicknameExists);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        Self::check_unique(&users, &user)?;
        users.insert(user.id, user.clone());

        tracing::debug!(user_id = %user.id, "Stored user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.nickname == nickname).cloned())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        let Some(existing) = users.get(&user.id) else {
            return Err(UserError::NotFound);
        };
        Self::check_unique(&users, &user)?;

        let stored = User {
            password: existing.password.clone(),
            created_at: existing.created_at,
            ..user
        };
        users.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
        updated_at: DateTime<Utc>,
    ) -> UserResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(UserError::NotFound)?;

        user.password = password_hash;
        user.updated_at = updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> UserResult<()> {
        let mut users = self.users.write().await;

        users.remove(&id).map(|_| ()).ok_or(UserError::NotFound)
    }

    async fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> UserResult<(Vec<User>, u64)> {
        let users = self.users.read().await;

        let mut matching: Vec<User> = users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        let total = matching.len() as u64;

        // Sort by created_at descending (newest first)
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();

        Ok((page, total))
    }

    async fn health_check(&self) -> UserResult<()> {
        Ok(())
    }
}
