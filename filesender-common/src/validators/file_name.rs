//! File name validation
//!
//! Validates file names offered by the server before they are joined onto a
//! local download directory.

/// Maximum length for file names in bytes
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Validation error for file names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileNameError {
    /// Name is empty
    Empty,
    /// Name exceeds maximum length
    TooLong,
    /// Name contains a path separator
    ContainsSeparator,
    /// Name is "." or ".."
    Reserved,
    /// Name contains null bytes or control characters
    InvalidCharacters,
}

/// Validate a file name from the server
///
/// Checks:
/// - Not empty
/// - Does not exceed maximum length (255 bytes)
/// - No `/` or `\` (the name must stay inside the download directory)
/// - Not `.` or `..`
/// - No control characters
///
/// # Errors
///
/// Returns a `FileNameError` variant describing the validation failure.
pub fn validate_file_name(name: &str) -> Result<(), FileNameError> {
    if name.is_empty() {
        return Err(FileNameError::Empty);
    }

    if name.len() > MAX_FILE_NAME_LENGTH {
        return Err(FileNameError::TooLong);
    }

    if name == "." || name == ".." {
        return Err(FileNameError::Reserved);
    }

    for ch in name.chars() {
        if ch == '/' || ch == '\\' {
            return Err(FileNameError::ContainsSeparator);
        }
        if ch.is_control() {
            return Err(FileNameError::InvalidCharacters);
        }
    }

    Ok(())
}
