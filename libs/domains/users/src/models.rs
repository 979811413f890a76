use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// User entity - matches SQL schema
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    /// Argon2 PHC string, never the plaintext
    pub password: String,
    pub email: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New user with a fresh id and matching timestamps.
    /// `password_hash` must already be hashed.
    pub fn new(input: CreateUser, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            first_name: input.first_name,
            last_name: input.last_name,
            nickname: input.nickname,
            password: password_hash,
            email: input.email,
            country: input.country,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the non-empty fields of `update` and bump `updated_at`.
    pub fn apply_update(&mut self, update: UpdateUser) {
        fn replace(target: &mut String, value: Option<String>) {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                *target = value;
            }
        }

        replace(&mut self.first_name, update.first_name);
        replace(&mut self.last_name, update.last_name);
        replace(&mut self.nickname, update.nickname);
        replace(&mut self.email, update.email);
        replace(&mut self.country, update.country);
        self.updated_at = Utc::now();
    }
}

/// Outward representation of a user. Carries no password field at all,
/// so neither HTTP responses nor event payloads can leak the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            nickname: user.nickname,
            email: user.email,
            country: user.country,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user. Domain rules are checked by the service;
/// the derive only bounds field sizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub nickname: String,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub country: String,
}

/// Partial update: absent or empty fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 50))]
    pub nickname: Option<String>,
    #[validate(length(max = 255))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

impl UpdateUser {
    /// Supplied value when it differs from `current`
    pub(crate) fn changed<'a>(value: &'a Option<String>, current: &str) -> Option<&'a str> {
        value
            .as_deref()
            .filter(|v| !v.is_empty() && *v != current)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePassword {
    #[serde(default)]
    #[validate(length(max = 128))]
    pub password: String,
}

/// Case-insensitive substring filters, combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

impl UserFilter {
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// `(column, needle)` pairs for the filters that are set and non-empty
    pub fn active(&self) -> Vec<(&'static str, &str)> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("nickname", &self.nickname),
            ("email", &self.email),
            ("country", &self.country),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (column, v))
        })
        .collect()
    }

    pub fn matches(&self, user: &User) -> bool {
        self.active().into_iter().all(|(column, needle)| {
            let value = match column {
                "first_name" => &user.first_name,
                "last_name" => &user.last_name,
                "nickname" => &user.nickname,
                "email" => &user.email,
                _ => &user.country,
            };
            value.to_lowercase().contains(&needle.to_lowercase())
        })
    }
}

/// 1-indexed page request, always normalized before use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Page `<= 0` becomes 1, size `<= 0` becomes the default, size is capped at 100
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page <= 0 { 1 } else { page as u64 };
        let page_size = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            (page_size as u64).min(MAX_PAGE_SIZE)
        };
        Self { page, page_size }
    }

    /// Rows to skip; saturates so it always fits a Postgres `bigint`
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.page_size)
            .min(i64::MAX as u64)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE as i64)
    }
}

/// Query string of `GET /users`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Substring of the first name
    pub firstname: Option<String>,
    /// Substring of the last name
    pub lastname: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    /// 1-indexed page, defaults to 1
    pub page: Option<i64>,
    /// Defaults to 10, capped at 100
    pub page_size: Option<i64>,
}

impl ListUsersQuery {
    pub fn into_parts(self) -> (UserFilter, Pagination) {
        let filter = UserFilter {
            first_name: self.firstname,
            last_name: self.lastname,
            nickname: self.nickname,
            email: self.email,
            country: self.country,
        };
        let pagination = Pagination::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE as i64),
        );
        (filter, pagination)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    /// Matches across all pages
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
