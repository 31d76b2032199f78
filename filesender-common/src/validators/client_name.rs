//! Client display name validation

/// Maximum length for client display names in characters
pub const MAX_CLIENT_NAME_LENGTH: usize = 64;

/// Validation error for client names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNameError {
    /// Name is empty or only whitespace
    Empty,
    /// Name exceeds maximum length
    TooLong,
    /// Name contains control characters
    InvalidCharacters,
}

/// Validate the display name sent in the authentication request
///
/// # Errors
///
/// Returns a `ClientNameError` variant describing the validation failure.
pub fn validate_client_name(name: &str) -> Result<(), ClientNameError> {
    if name.trim().is_empty() {
        return Err(ClientNameError::Empty);
    }

    if name.chars().count() > MAX_CLIENT_NAME_LENGTH {
        return Err(ClientNameError::TooLong);
    }

    if name.chars().any(char::is_control) {
        return Err(ClientNameError::InvalidCharacters);
    }

    Ok(())
}
