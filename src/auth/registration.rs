// Account registration

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use super::password::hash_password;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::file_storage::UserStore;
use crate::models::{StoreError, User};
use crate::utils::generate_id;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Trimmed, lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Every problem with the form, in field order
pub fn validation_problems(request: &RegisterRequest) -> Vec<&'static str> {
    let mut problems = Vec::new();

    if !email_regex().is_match(request.email.trim()) {
        problems.push("Invalid email format");
    }

    let password = &request.password;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push("Password must be at least 8 characters");
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        problems.push(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }

    problems
}

/// Validate the form and create the account
pub fn register(users: &UserStore, request: RegisterRequest) -> AppResult<User> {
    let problems = validation_problems(&request);
    if !problems.is_empty() {
        return Err(AppError::validation(problems.join(", ")));
    }

    let email = normalize_email(&request.email);
    if users.find_by_email(&email).is_some() {
        return Err(duplicate_email());
    }

    let user = User {
        id: generate_id(),
        email,
        name: request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        password_hash: hash_password(&request.password)?,
        created_at: Utc::now(),
    };

    let user = users.insert(user).map_err(|e| match e {
        StoreError::Duplicate(_) => duplicate_email(),
        other => AppError::store(other.to_string()),
    })?;

    log::info!("New user registered: {}", user.id);
    Ok(user)
}

fn duplicate_email() -> AppError {
    AppError::Validation {
        message: "User with this email already exists".to_string(),
        code: ErrorCode::DuplicateRecord,
        context: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_all_problems_reported_together() {
        let problems = validation_problems(&request("not-an-email", "short"));
        assert_eq!(
            problems.join(", "),
            "Invalid email format, Password must be at least 8 characters, \
             Password must contain at least one uppercase letter, one lowercase letter, and one number"
        );
    }

    #[test]
    fn test_password_character_classes() {
        assert_eq!(validation_problems(&request("a@b.co", "alllowercase1")).len(), 1);
        assert_eq!(validation_problems(&request("a@b.co", "NoDigitsHere")).len(), 1);
        assert!(validation_problems(&request("a@b.co", "Secret123")).is_empty());
    }

    #[test]
    fn test_email_format() {
        assert!(email_regex().is_match("dana@example.com"));
        assert!(!email_regex().is_match("dana@example"));
        assert!(!email_regex().is_match("da na@example.com"));
    }

    #[test]
    fn test_register_normalizes_and_rejects_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let users = UserStore::open(temp_dir.path()).unwrap();

        let user = register(&users, request("  Dana@Example.COM ", "Secret123")).unwrap();
        assert_eq!(user.email, "dana@example.com");
        assert_ne!(user.password_hash, "Secret123");

        let err = register(&users, request("dana@example.com", "Secret123")).unwrap_err();
        assert_eq!(err.to_string(), "User with this email already exists");
        assert_eq!(err.status_code().as_u16(), 400);
    }
}
