//! Field rules shared by create, update and password change.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, UpdateUser};

pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

fn require(value: &str, field: &str) -> UserResult<()> {
    if value.is_empty() {
        return Err(UserError::invalid(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> UserResult<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(UserError::invalid("invalid email format"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> UserResult<()> {
    if password.is_empty() {
        return Err(UserError::invalid("password cannot be empty"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

/// First failing rule wins, in field order
pub fn validate_create(input: &CreateUser) -> UserResult<()> {
    require(&input.first_name, "first name")?;
    require(&input.last_name, "last name")?;
    require(&input.nickname, "nickname")?;
    require(&input.country, "country")?;
    require(&input.email, "email")?;
    validate_email(&input.email)?;
    validate_password(&input.password)
}

/// Only a supplied email is re-checked; empty fields mean "unchanged".
pub fn validate_update(input: &UpdateUser) -> UserResult<()> {
    match input.email.as_deref() {
        Some(email) if !email.is_empty() => validate_email(email),
        _ => Ok(()),
    }
}

pub fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::internal("hash password", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    fn valid_input() -> CreateUser {
        CreateUser {
            first_name: "Alice".into(),
            last_name: "Bob".into(),
            nickname: "AB123".into(),
            password: "supersecurepassword".into(),
            email: "alice@bob.com".into(),
            country: "UK".into(),
        }
    }

    #[test]
    fn test_valid_create() {
        assert!(validate_create(&valid_input()).is_ok());
    }

    #[test]
    fn test_missing_fields_named() {
        let blank = |clear: fn(&mut CreateUser)| {
            let mut input = valid_input();
            clear(&mut input);
            input
        };
        let cases = [
            (blank(|u| u.first_name.clear()), "first name is required"),
            (blank(|u| u.last_name.clear()), "last name is required"),
            (blank(|u| u.nickname.clear()), "nickname is required"),
            (blank(|u| u.country.clear()), "country is required"),
            (blank(|u| u.email.clear()), "email is required"),
        ];

        for (input, message) in cases {
            let err = validate_create(&input).unwrap_err();
            assert!(matches!(err, UserError::InvalidInput(_)));
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_email_syntax() {
        assert!(validate_email("alice@bob.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("alice@bob").is_err());
        assert!(validate_email("alice.bob.com").is_err());
        assert!(validate_email("alice@bob.c").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_password("").unwrap_err().to_string(),
            "password cannot be empty"
        );
        assert_eq!(
            validate_password("short").unwrap_err().to_string(),
            "password must be at least 8 characters long"
        );
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_update_rechecks_only_supplied_email() {
        let with_email = |email: &str| UpdateUser {
            email: Some(email.to_string()),
            ..Default::default()
        };

        assert!(validate_update(&UpdateUser::default()).is_ok());
        assert!(validate_update(&with_email("")).is_ok());
        assert!(validate_update(&with_email("nope")).is_err());
    }

    #[test]
    fn test_hash_is_one_way_and_verifiable() {
        let hash = hash_password("supersecurepassword").unwrap();
        assert_ne!(hash, "supersecurepassword");
        assert!(hash.starts_with("$argon2"));

        let parsed = PasswordHash::new(&hash).unwrap();
        let argon2 = Argon2::default();
        assert!(argon2.verify_password(b"supersecurepassword", &parsed).is_ok());
        assert!(argon2.verify_password(b"wrongpassword", &parsed).is_err());
    }
}
