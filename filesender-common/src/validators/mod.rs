//! Input validation functions
//!
//! Values the server sends are untrusted. These validators run before a
//! server-provided value is used to touch the local filesystem.

mod client_name;
mod file_name;

pub use client_name::{ClientNameError, MAX_CLIENT_NAME_LENGTH, validate_client_name};
pub use file_name::{FileNameError, MAX_FILE_NAME_LENGTH, validate_file_name};
