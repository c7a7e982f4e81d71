//! Input validation utilities.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{LearningError, LearningResult};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,})+$").expect("email regex is valid")
});

const MAX_EMAIL_LENGTH: usize = 255;
const MAX_NAME_LENGTH: usize = 50;

/// Emails are case-insensitive; store and look them up lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format
pub fn validate_email(email: &str) -> LearningResult<()> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(LearningError::invalid("Email too long"));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(LearningError::invalid("Invalid email format"));
    }

    Ok(())
}

/// Validate display name
pub fn validate_display_name(name: &str) -> LearningResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LearningError::invalid("Name cannot be empty"));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(LearningError::invalid(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters long"
        )));
    }

    Ok(())
}

/// Validate password length against the configured minimum
pub fn validate_password(password: &str, min_length: usize) -> LearningResult<()> {
    if password.chars().count() < min_length {
        return Err(LearningError::invalid(format!(
            "Password must be at least {min_length} characters long"
        )));
    }

    if password.len() > 128 {
        return Err(LearningError::invalid(
            "Password must be less than 128 characters long",
        ));
    }

    Ok(())
}

/// Non-empty, bounded free text (questions, comments, answers).
pub fn validate_text(field: &str, text: &str, max_length: usize) -> LearningResult<()> {
    if text.trim().is_empty() {
        return Err(LearningError::invalid(format!("{field} cannot be empty")));
    }

    if text.chars().count() > max_length {
        return Err(LearningError::invalid(format!(
            "{field} cannot be longer than {max_length} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("learner@example.com").is_ok());
        assert!(validate_email("first.last@school.photo.ru").is_ok());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("learner@").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Mixed@Case.Org "), "mixed@case.org");
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Anna").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(51)).is_err());
        assert!(validate_display_name(&"я".repeat(50)).is_ok());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret", 6).is_ok());
        assert!(validate_password("short", 6).is_err());
    }

    #[test]
    fn test_validate_text_bounds() {
        assert!(validate_text("Comment", "fine", 10).is_ok());
        assert!(validate_text("Comment", "", 10).is_err());
        assert!(validate_text("Comment", "  \n", 10).is_err());
        assert!(validate_text("Comment", &"a".repeat(11), 10).is_err());
        assert!(validate_text("Comment", &"a".repeat(10), 10).is_ok());
    }
}
