//! Persistent user settings
//!
//! Settings live in `config.json` under the platform config directory. Every
//! field has a default, so a partial or missing file is fine.

use std::fs;
use std::path::{Path, PathBuf};

use filesender_common::DEFAULT_PORT;

use super::ConfigError;
use crate::constants::{APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CLIENT_NAME, DEFAULT_WRITE_QUEUE_DEPTH};

/// File permissions for the settings file on Unix (owner read/write only)
#[cfg(unix)]
const SETTINGS_FILE_MODE: u32 = 0o600;

/// Default log level when neither `RUST_LOG` nor `--debug` is given
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// User preferences for the client
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    /// Display name sent to the host
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Host to connect to when `--url` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Where downloads go
    /// Defaults to the system downloads directory if not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Accept every file offer without asking
    #[serde(default)]
    pub auto_accept: bool,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fail transfers that receive nothing for this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stall_timeout_secs: Option<u64>,

    /// Writes queued per transfer before delivery waits for the disk
    #[serde(default = "default_write_queue_depth")]
    pub write_queue_depth: usize,
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_write_queue_depth() -> usize {
    DEFAULT_WRITE_QUEUE_DEPTH
}

/// Host used when neither the settings nor the command line name one
pub fn default_server_url() -> String {
    format!("ws://localhost:{}", DEFAULT_PORT)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            server_url: None,
            download_dir: None,
            auto_accept: false,
            log_level: default_log_level(),
            stall_timeout_secs: None,
            write_queue_depth: default_write_queue_depth(),
        }
    }
}

impl Settings {
    /// Get the platform-specific settings file path
    ///
    /// Returns None if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load settings from `path`, or defaults if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not valid
    /// settings JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from the platform default location
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Save settings to `path` with restrictive permissions
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, json).map_err(write_error)?;

        #[cfg(unix)]
        set_settings_permissions(path).map_err(write_error)?;

        Ok(())
    }
}

/// Set settings file permissions to owner read/write only on Unix systems
#[cfg(unix)]
fn set_settings_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(SETTINGS_FILE_MODE);
    fs::set_permissions(path, perms)
}
