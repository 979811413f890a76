use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::events::{EventType, deleted_payload, user_payload};
use crate::models::{
    CreateUser, ListUsersResponse, Pagination, UpdateUser, User, UserFilter, UserResponse,
};
use crate::notifier::Notifier;
use crate::repository::UserRepository;
use crate::validation::{hash_password, validate_create, validate_password, validate_update};

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Service layer for User business logic
///
/// Every returned user is a [`UserResponse`], which has no password field.
/// Successful mutations publish a change event from a detached task; the
/// caller never waits for it and a publish failure is only logged.
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    notifier: Arc<dyn Notifier>,
    publish_timeout: Duration,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            notifier: Arc::clone(&self.notifier),
            publish_timeout: self.publish_timeout,
        }
    }
}

impl<R: UserRepository + 'static> UserService<R> {
    pub fn new(repository: R, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository: Arc::new(repository),
            notifier,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Upper bound on a single detached publish attempt
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Validate, pre-check uniqueness, hash, persist, then notify.
    ///
    /// The pre-check is advisory. A concurrent create can still lose at the
    /// storage constraint, which surfaces as the same conflict kind.
    #[instrument(skip(self, input), fields(nickname = %input.nickname))]
    pub async fn create_user(&self, input: CreateUser) -> UserResult<UserResponse> {
        validate_create(&input)?;

        if self.find_by_email(&input.email, "create user").await?.is_some() {
            return Err(UserError::EmailExists);
        }
        if self
            .find_by_nickname(&input.nickname, "create user")
            .await?
            .is_some()
        {
            return Err(UserError::NicknameExists);
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input, password_hash);

        let created = self
            .repository
            .create(user)
            .await
            .map_err(|e| storage_write_error(e, "create user"))?;

        let response = UserResponse::from(created);
        info!(user_id = %response.id, "User created");

        self.notify(EventType::UserCreated, user_payload(&response));
        Ok(response)
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self.find_existing(id, "get user").await?;
        Ok(user.into())
    }

    /// Partial update: empty fields keep their stored value. Uniqueness is
    /// re-checked only for values that actually change.
    #[instrument(skip(self, input), fields(user_id = %id))]
    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> UserResult<UserResponse> {
        require_id(id)?;
        validate_update(&input)?;

        let mut user = self.find_existing(id, "update user").await?;

        if let Some(email) = UpdateUser::changed(&input.email, &user.email) {
            if self.find_by_email(email, "update user").await?.is_some() {
                return Err(UserError::EmailExists);
            }
        }
        if let Some(nickname) = UpdateUser::changed(&input.nickname, &user.nickname) {
            if self
                .find_by_nickname(nickname, "update user")
                .await?
                .is_some()
            {
                return Err(UserError::NicknameExists);
            }
        }

        user.apply_update(input);

        let updated = self
            .repository
            .update(user)
            .await
            .map_err(|e| storage_write_error(e, "update user"))?;

        let response = UserResponse::from(updated);
        info!("User updated");

        self.notify(EventType::UserUpdated, user_payload(&response));
        Ok(response)
    }

    /// Replace only the password hash. Publishes nothing.
    #[instrument(skip(self, password), fields(user_id = %id))]
    pub async fn update_password(&self, id: Uuid, password: &str) -> UserResult<()> {
        require_id(id)?;
        validate_password(password)?;

        self.find_existing(id, "update password").await?;

        let password_hash = hash_password(password)?;
        self.repository
            .update_password(id, password_hash, Utc::now())
            .await
            .map_err(|e| e.context("update password"))?;

        info!("Password updated");
        Ok(())
    }

    /// Hard delete. An absent id is `NotFound`, not a silent no-op.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        self.find_existing(id, "delete user").await?;

        self.repository
            .delete(id)
            .await
            .map_err(|e| e.context("delete user"))?;

        info!("User deleted");
        self.notify(EventType::UserDeleted, deleted_payload(id));
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> UserResult<ListUsersResponse> {
        let (users, total_count) = self
            .repository
            .list(filter, pagination)
            .await
            .map_err(|e| e.context("list users"))?;

        Ok(ListUsersResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            total_count,
            page: pagination.page,
            page_size: pagination.page_size,
        })
    }

    /// Persistence liveness probe
    pub async fn health_check(&self) -> UserResult<()> {
        self.repository.health_check().await
    }

    async fn find_existing(&self, id: Uuid, operation: &str) -> UserResult<User> {
        require_id(id)?;

        self.repository
            .get_by_id(id)
            .await
            .map_err(|e| e.context(operation))?
            .ok_or(UserError::NotFound)
    }

    async fn find_by_email(&self, email: &str, operation: &str) -> UserResult<Option<User>> {
        self.repository
            .get_by_email(email)
            .await
            .map_err(|e| e.context(operation))
    }

    async fn find_by_nickname(&self, nickname: &str, operation: &str) -> UserResult<Option<User>> {
        self.repository
            .get_by_nickname(nickname)
            .await
            .map_err(|e| e.context(operation))
    }

    /// Fire and forget, bounded by `publish_timeout` rather than the caller's lifetime
    fn notify(&self, event_type: EventType, payload: Value) {
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.publish_timeout;
        let span = info_span!("notify", %event_type);

        tokio::spawn(
            async move {
                match tokio::time::timeout(timeout, notifier.publish(event_type, payload)).await {
                    Ok(Ok(())) => debug!("Notification published"),
                    Ok(Err(e)) => error!(error = %e, "Failed to publish notification"),
                    Err(_) => error!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Notification publish timed out, abandoning"
                    ),
                }
            }
            .instrument(span),
        );
    }
}

/// A conflict here means a concurrent write won the race past the pre-check.
fn storage_write_error(err: UserError, operation: &str) -> UserError {
    if err.is_conflict() {
        warn!(error = %err, operation, "Storage uniqueness constraint rejected the write");
    }
    err.context(operation)
}

/// The nil UUID stands in for an empty id
fn require_id(id: Uuid) -> UserResult<()> {
    if id.is_nil() {
        return Err(UserError::invalid("id is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::notifier::{MockNotifier, NotificationError, RecordingNotifier};
    use crate::repository::{InMemoryUserRepository, MockUserRepository};
    use async_trait::async_trait;
    use std::time::Instant;

    fn alice() -> CreateUser {
        CreateUser {
            first_name: "Alice".into(),
            last_name: "Bob".into(),
            nickname: "AB123".into(),
            password: "supersecurepassword".into(),
            email: "alice@bob.com".into(),
            country: "UK".into(),
        }
    }

    fn in_memory() -> (UserService<InMemoryUserRepository>, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let service = UserService::new(InMemoryUserRepository::new(), Arc::new(notifier.clone()));
        (service, notifier)
    }

    /// Detached publishes land shortly after the call returns
    async fn wait_for_events(notifier: &RecordingNotifier, count: usize) -> Vec<Event> {
        for _ in 0..100 {
            let events = notifier.events().await;
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        notifier.events().await
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let (service, notifier) = in_memory();

        let user = service.create_user(alice()).await.unwrap();

        assert!(!user.id.is_nil());
        assert_eq!(user.country, "UK");
        assert!(serde_json::to_value(&user).unwrap().get("password").is_none());

        let events = wait_for_events(&notifier, 1).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::UserCreated);
        assert_eq!(events[0].payload["id"], user.id.to_string());
        assert!(events[0].payload.get("password").is_none());
    }

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let (service, _) = in_memory();

        let first = service.create_user(alice()).await.unwrap();
        let second = service
            .create_user(CreateUser {
                nickname: "CD456".into(),
                email: "carol@bob.com".into(),
                ..alice()
            })
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_create_duplicate_email_skips_persistence() {
        let existing = User::new(alice(), "hash".into());

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_create().never();

        let mut notifier = MockNotifier::new();
        notifier.expect_publish().never();

        let service = UserService::new(repo, Arc::new(notifier));
        let result = service
            .create_user(CreateUser {
                nickname: "other".into(),
                ..alice()
            })
            .await;

        assert!(matches!(result, Err(UserError::EmailExists)));
    }

    #[tokio::test]
    async fn test_create_duplicate_nickname() {
        let (service, _) = in_memory();
        service.create_user(alice()).await.unwrap();

        let result = service
            .create_user(CreateUser {
                email: "other@bob.com".into(),
                ..alice()
            })
            .await;

        assert!(matches!(result, Err(UserError::NicknameExists)));
    }

    #[tokio::test]
    async fn test_create_storage_conflict_passes_through() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email().returning(|_| Ok(None));
        repo.expect_get_by_nickname().returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|_| Err(UserError::EmailExists));

        let mut notifier = MockNotifier::new();
        notifier.expect_publish().never();

        let service = UserService::new(repo, Arc::new(notifier));
        let err = service.create_user(alice()).await.unwrap_err();

        assert!(matches!(err, UserError::EmailExists));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_storage_conflict_passes_through() {
        let existing = User::new(alice(), "hash".into());
        let id = existing.id;

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_get_by_nickname().returning(|_| Ok(None));
        repo.expect_update()
            .times(1)
            .returning(|_| Err(UserError::NicknameExists));

        let mut notifier = MockNotifier::new();
        notifier.expect_publish().never();

        let service = UserService::new(repo, Arc::new(notifier));
        let update = UpdateUser {
            nickname: Some("CD456".into()),
            ..Default::default()
        };
        let err = service.update_user(id, update).await.unwrap_err();

        assert!(matches!(err, UserError::NicknameExists));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_health_check_uses_repository_probe() {
        let mut repo = MockUserRepository::new();
        repo.expect_health_check()
            .times(1)
            .returning(|| Err(UserError::internal("ping", "connection refused")));

        let service = UserService::new(repo, Arc::new(MockNotifier::new()));
        let err = service.health_check().await.unwrap_err();

        assert_eq!(err.to_string(), "ping: connection refused");
    }

    #[tokio::test]
    async fn test_create_short_password() {
        let mut repo = MockUserRepository::new();
        repo.expect_create().never();

        let service = UserService::new(repo, Arc::new(RecordingNotifier::new()));
        let err = service
            .create_user(CreateUser {
                password: "short".into(),
                ..alice()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::InvalidInput(_)));
        assert!(err.to_string().contains("at least 8 characters"));
    }

    #[tokio::test]
    async fn test_get_user_nil_and_unknown() {
        let (service, _) = in_memory();

        let err = service.get_user(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, UserError::InvalidInput(_)));

        let err = service.get_user(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_user_wraps_internal_errors() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .returning(|_| Err(UserError::Internal("connection refused".into())));

        let service = UserService::new(repo, Arc::new(RecordingNotifier::new()));
        let err = service.get_user(Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err.to_string(), "get user: connection refused");
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_country_only() {
        let (service, notifier) = in_memory();
        let created = service.create_user(alice()).await.unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    country: Some("FR".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.country, "FR");
        assert_eq!(updated.first_name, created.first_name);
        assert_eq!(updated.last_name, created.last_name);
        assert_eq!(updated.nickname, created.nickname);
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        let events = wait_for_events(&notifier, 2).await;
        assert_eq!(events[1].event_type, EventType::UserUpdated);
        assert_eq!(events[1].payload["country"], "FR");
    }

    #[tokio::test]
    async fn test_update_same_values_is_not_a_conflict() {
        let (service, _) = in_memory();
        let created = service.create_user(alice()).await.unwrap();

        let result = service
            .update_user(
                created.id,
                UpdateUser {
                    email: Some(created.email.clone()),
                    nickname: Some(created.nickname.clone()),
                    ..Default::default()
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_to_taken_email() {
        let (service, _) = in_memory();
        service.create_user(alice()).await.unwrap();
        let carol = service
            .create_user(CreateUser {
                nickname: "CD456".into(),
                email: "carol@bob.com".into(),
                ..alice()
            })
            .await
            .unwrap();

        let result = service
            .update_user(
                carol.id,
                UpdateUser {
                    email: Some("alice@bob.com".into()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserError::EmailExists)));
    }

    #[tokio::test]
    async fn test_update_invalid_email() {
        let (service, _) = in_memory();
        let created = service.create_user(alice()).await.unwrap();

        let err = service
            .update_user(
                created.id,
                UpdateUser {
                    email: Some("not-an-email".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "invalid email format");
    }

    #[tokio::test]
    async fn test_update_password_publishes_nothing() {
        let (service, notifier) = in_memory();
        let created = service.create_user(alice()).await.unwrap();
        wait_for_events(&notifier, 1).await;

        service
            .update_password(created.id, "anotherlongpassword")
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.events().await.len(), 1);

        let err = service.update_password(created.id, "short").await.unwrap_err();
        assert!(matches!(err, UserError::InvalidInput(_)));

        let err = service
            .update_password(Uuid::new_v4(), "anotherlongpassword")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (service, notifier) = in_memory();
        let created = service.create_user(alice()).await.unwrap();

        service.delete_user(created.id).await.unwrap();
        assert!(service.get_user(created.id).await.unwrap_err().is_not_found());

        let events = wait_for_events(&notifier, 2).await;
        assert_eq!(events[1].event_type, EventType::UserDeleted);
        assert_eq!(
            events[1].payload,
            serde_json::json!({ "id": created.id.to_string() })
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));
        repo.expect_delete().never();

        let service = UserService::new(repo, Arc::new(RecordingNotifier::new()));
        let err = service.delete_user(Uuid::new_v4()).await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_users_by_country() {
        let (service, _) = in_memory();
        for i in 0..12 {
            service
                .create_user(CreateUser {
                    nickname: format!("uk{i}"),
                    email: format!("uk{i}@bob.com"),
                    ..alice()
                })
                .await
                .unwrap();
        }
        service
            .create_user(CreateUser {
                nickname: "fr".into(),
                email: "fr@bob.com".into(),
                country: "FR".into(),
                ..alice()
            })
            .await
            .unwrap();

        let result = service
            .list_users(UserFilter::default().with_country("uk"), Pagination::new(1, 10))
            .await
            .unwrap();

        assert_eq!(result.users.len(), 10);
        assert_eq!(result.total_count, 12);
        assert_eq!(result.page, 1);
        assert_eq!(result.page_size, 10);
        assert!(result.users.iter().all(|u| u.country == "UK"));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_mutation() {
        let mut notifier = MockNotifier::new();
        notifier.expect_publish().returning(|_, _| {
            Err(NotificationError::Publish(stream_worker::StreamError::Config(
                "stream unavailable".into(),
            )))
        });

        let service = UserService::new(InMemoryUserRepository::new(), Arc::new(notifier));
        assert!(service.create_user(alice()).await.is_ok());
    }

    struct StalledNotifier;

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn publish(&self, _: EventType, _: Value) -> Result<(), NotificationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stalled_notifier_does_not_block_caller() {
        let service = UserService::new(InMemoryUserRepository::new(), Arc::new(StalledNotifier))
            .with_publish_timeout(Duration::from_millis(20));

        let start = Instant::now();
        service.create_user(alice()).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
