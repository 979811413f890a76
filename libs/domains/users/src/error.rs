use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("email already exists")]
    EmailExists,

    #[error("nickname already exists")]
    NicknameExists,

    #[error("user not found")]
    NotFound,

    /// Storage or hashing failure, prefixed with the operation that hit it
    #[error("{0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn invalid(message: impl Into<String>) -> Self {
        UserError::InvalidInput(message.into())
    }

    /// Wrap a lower-layer failure with the operation it interrupted.
    pub fn internal(operation: &str, cause: impl std::fmt::Display) -> Self {
        UserError::Internal(format!("{operation}: {cause}"))
    }

    /// Re-wrap with an outer operation, keeping every other kind intact
    /// so `is_not_found` and the conflict kinds survive propagation.
    pub fn context(self, operation: &str) -> Self {
        match self {
            UserError::Internal(cause) => UserError::Internal(format!("{operation}: {cause}")),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UserError::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, UserError::EmailExists | UserError::NicknameExists)
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidInput(msg) => AppError::BadRequest(msg),
            UserError::EmailExists | UserError::NicknameExists => {
                AppError::Conflict(err.to_string())
            }
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_context_preserves_not_found() {
        let err = UserError::NotFound.context("delete user");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_context_prefixes_internal() {
        let err = UserError::internal("insert", "connection reset").context("create user");
        assert_eq!(err.to_string(), "create user: insert: connection reset");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (UserError::invalid("first name is required"), StatusCode::BAD_REQUEST),
            (UserError::EmailExists, StatusCode::CONFLICT),
            (UserError::NicknameExists, StatusCode::CONFLICT),
            (UserError::NotFound, StatusCode::NOT_FOUND),
            (UserError::internal("list users", "boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
