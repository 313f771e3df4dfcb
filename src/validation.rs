//! Form-level validation, applied before anything reaches the store or the
//! network.

use crate::types::TaskFormData;
use chrono::NaiveDate;
use regex_lite::Regex;
use std::sync::LazyLock;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MIN_PASSWORD_CHARS: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Title must be 100 characters or less")]
    TitleTooLong,
    #[error("Description must be 1000 characters or less")]
    DescriptionTooLong,
    #[error("Due date must be a date in YYYY-MM-DD form, got '{0}'")]
    InvalidDueDate(String),
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password must contain at least one uppercase letter")]
    PasswordMissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    PasswordMissingLowercase,
    #[error("Password must contain at least one number")]
    PasswordMissingDigit,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Raw task form input as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct TaskFormInput<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<&'a str>,
}

/// Validate and normalize a task form.
///
/// Title and description are trimmed; an empty description is dropped.
pub fn task_form(input: &TaskFormInput<'_>) -> Result<TaskFormData, ValidationError> {
    let title = validate_title(input.title)?;
    let description = match input.description {
        Some(raw) => normalize_description(raw)?,
        None => None,
    };
    let due_date = match input.due_date.map(str::trim) {
        Some("") | None => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDueDate(raw.to_string()))?,
        ),
    };
    Ok(TaskFormData {
        title,
        description,
        due_date,
    })
}

/// Validate a title on its own, as an edit that only renames would.
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(title.to_string())
}

/// Trim a description; blank means no description.
pub fn normalize_description(description: &str) -> Result<Option<String>, ValidationError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(Some(description).filter(|d| !d.is_empty()).map(String::from))
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Password policy: length, then uppercase, lowercase and digit, reported in
/// that order.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::PasswordMissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::PasswordMissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasswordMissingDigit);
    }
    Ok(())
}

/// Sign-up check: confirmation first, then policy.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    validate_password(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_form_trims_and_drops_empty_description() {
        let data = task_form(&TaskFormInput {
            title: "  Buy milk ",
            description: Some("   "),
            due_date: Some("2025-06-01"),
        })
        .unwrap();
        assert_eq!(data.title, "Buy milk");
        assert_eq!(data.description, None);
        assert_eq!(data.due_date, NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    #[test]
    fn test_title_rules() {
        assert_eq!(validate_title("   "), Err(ValidationError::TitleRequired));
        assert!(validate_title(&"a".repeat(100)).is_ok());
        assert_eq!(
            validate_title(&"a".repeat(101)),
            Err(ValidationError::TitleTooLong)
        );
        // Multi-byte characters count once each.
        assert!(validate_title(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn test_description_limit() {
        let err = task_form(&TaskFormInput {
            title: "ok",
            description: Some(&"d".repeat(1001)),
            due_date: None,
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::DescriptionTooLong);
        assert!(normalize_description(&"d".repeat(1000)).is_ok());
    }

    #[test]
    fn test_blank_description_normalizes_to_none() {
        assert_eq!(normalize_description(" \t "), Ok(None));
        assert_eq!(
            normalize_description("  Weekly shop "),
            Ok(Some("Weekly shop".to_string()))
        );
    }

    #[test]
    fn test_bad_due_date() {
        let err = task_form(&TaskFormInput {
            title: "ok",
            description: None,
            due_date: Some("tomorrow"),
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidDueDate("tomorrow".into()));
    }

    #[test]
    fn test_password_policy() {
        assert_eq!(validate_password("Ab1"), Err(ValidationError::PasswordTooShort));
        assert_eq!(
            validate_password("abcdefg1"),
            Err(ValidationError::PasswordMissingUppercase)
        );
        assert_eq!(
            validate_password("ABCDEFG1"),
            Err(ValidationError::PasswordMissingLowercase)
        );
        assert_eq!(
            validate_password("Abcdefgh"),
            Err(ValidationError::PasswordMissingDigit)
        );
        assert!(validate_password("Abcdefg1").is_ok());
    }

    #[test]
    fn test_confirmation_checked_before_policy() {
        assert_eq!(
            validate_new_password("short", "different"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_new_password("Abcdefg1", "Abcdefg1").is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("jane.doe@example.com").is_ok());
        assert_eq!(validate_email("jane@"), Err(ValidationError::InvalidEmail));
        assert_eq!(
            validate_email("no-at-sign.com"),
            Err(ValidationError::InvalidEmail)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::TitleTooLong.to_string(),
            "Title must be 100 characters or less"
        );
    }
}
