//! Version helpers
//!
//! The client version is sent in every authentication request. It must be
//! valid semver so servers can compare it.

use semver::Version;

use crate::CLIENT_VERSION;

/// Parse the built-in client version
#[must_use]
pub fn client_version() -> Version {
    // CLIENT_VERSION comes from Cargo.toml, which cargo already requires to be semver
    Version::parse(CLIENT_VERSION).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Check that a version string is valid semver
///
/// # Errors
///
/// Returns the semver parse error if the string is not a valid version.
pub fn validate_version(version: &str) -> Result<Version, semver::Error> {
    Version::parse(version)
}
