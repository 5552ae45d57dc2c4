//! Input validation for user-supplied identity fields

use thiserror::Error;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 100;
const MAX_PASSWORD_LENGTH: usize = 1024;

/// Validation errors for user data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("Email cannot exceed {0} characters")]
    EmailTooLong(usize),

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name cannot exceed {0} characters")]
    NameTooLong(usize),

    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("Password cannot exceed {0} bytes")]
    PasswordTooLong(usize),
}

/// Trim and lower-case an email, rejecting anything without a local part and a host
pub fn normalize_email(email: &str) -> Result<String, UserValidationError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(UserValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    match email.split_once('@') {
        Some((local, host))
            if !local.is_empty()
                && !host.is_empty()
                && !host.contains('@')
                && !email.chars().any(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(UserValidationError::InvalidEmail(email)),
    }
}

/// Trim a display name and check its bounds
pub fn validate_name(name: &str) -> Result<String, UserValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(UserValidationError::EmptyName);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(UserValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    Ok(name.to_string())
}

/// Validate a password
///
/// Rules:
/// - Cannot be empty
/// - Maximum 1024 bytes, which bounds the work handed to the hasher
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.is_empty() {
        return Err(UserValidationError::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
        assert_eq!(normalize_email("ann.b+tag@mail.example").unwrap(), "ann.b+tag@mail.example");
    }

    #[test]
    fn test_invalid_emails() {
        assert_eq!(normalize_email(""), Err(UserValidationError::EmptyEmail));
        assert_eq!(normalize_email("   "), Err(UserValidationError::EmptyEmail));
        assert!(matches!(
            normalize_email("no-at-sign"),
            Err(UserValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            normalize_email("@x.com"),
            Err(UserValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            normalize_email("a@"),
            Err(UserValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            normalize_email("a@b@c"),
            Err(UserValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            normalize_email("a b@x.com"),
            Err(UserValidationError::InvalidEmail(_))
        ));

        let long = format!("{}@x.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert_eq!(
            normalize_email(&long),
            Err(UserValidationError::EmailTooLong(MAX_EMAIL_LENGTH))
        );
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ann ").unwrap(), "Ann");
        assert_eq!(validate_name(" "), Err(UserValidationError::EmptyName));
        assert_eq!(
            validate_name(&"n".repeat(MAX_NAME_LENGTH + 1)),
            Err(UserValidationError::NameTooLong(MAX_NAME_LENGTH))
        );
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("pw123").is_ok());
        assert_eq!(validate_password(""), Err(UserValidationError::EmptyPassword));
        assert_eq!(
            validate_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1)),
            Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH))
        );
    }
}
