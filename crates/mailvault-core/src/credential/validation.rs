//! Credential input validation.

use super::model::NewCredential;

/// A problem with a credential input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Password is empty.
    EmptyPassword,
    /// Client id is empty.
    EmptyClientId,
    /// Refresh token is empty.
    EmptyRefreshToken,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "email address is required",
            Self::InvalidEmail => "invalid email address format",
            Self::EmptyPassword => "password is required",
            Self::EmptyClientId => "client id is required",
            Self::EmptyRefreshToken => "refresh token is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email_address",
            Self::EmptyPassword => "password",
            Self::EmptyClientId => "client_id",
            Self::EmptyRefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a credential input.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a credential input.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_new_credential(input: &NewCredential) -> ValidationResult {
    let mut errors = Vec::new();

    if input.email_address.trim().is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(&input.email_address) {
        errors.push(ValidationError::InvalidEmail);
    }
    if input.password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    }
    if input.client_id.trim().is_empty() {
        errors.push(ValidationError::EmptyClientId);
    }
    if input.refresh_token.trim().is_empty() {
        errors.push(ValidationError::EmptyRefreshToken);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Join validation errors into one message.
#[must_use]
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `local@domain.tld` with no whitespace and non-empty domain labels.
fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
