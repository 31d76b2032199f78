//! Configuration
//!
//! Values come from the settings file, then command-line flags override them.
//! [`Config::resolve`] merges the two and validates the result.

mod settings;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use filesender_common::CLIENT_VERSION;
use filesender_common::validators::{ClientNameError, validate_client_name};

use crate::args::Args;
use crate::client::ClientSettings;
use crate::transfers::TransferSettings;

pub use settings::{DEFAULT_LOG_LEVEL, Settings, default_server_url};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid client name: {0:?}")]
    InvalidName(ClientNameError),

    #[error("invalid host url '{0}': expected ws:// or wss://")]
    InvalidUrl(String),

    #[error("write queue depth must be at least 1")]
    InvalidQueueDepth,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to connect to
    pub server_url: String,
    /// Settings handed to the client core
    pub client: ClientSettings,
    /// Where accepted files are written
    pub download_dir: PathBuf,
    /// Accept every offer
    pub auto_accept: bool,
    /// Files to request once logged in
    pub downloads: Vec<i32>,
    /// Print the file list and exit
    pub list_only: bool,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Config {
    /// Merge `settings` with `args`; flags win
    ///
    /// # Errors
    ///
    /// Returns an error if the merged values are not usable.
    pub fn resolve(settings: Settings, args: &Args) -> Result<Self, ConfigError> {
        let client_name = args.name.clone().unwrap_or(settings.client_name);
        validate_client_name(&client_name).map_err(ConfigError::InvalidName)?;

        let server_url = args
            .url
            .clone()
            .or(settings.server_url)
            .unwrap_or_else(default_server_url);
        if !is_websocket_url(&server_url) {
            return Err(ConfigError::InvalidUrl(server_url));
        }

        if settings.write_queue_depth == 0 {
            return Err(ConfigError::InvalidQueueDepth);
        }

        let download_dir = args
            .download_dir
            .clone()
            .or(settings.download_dir)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let stall_timeout = args
            .stall_timeout
            .or(settings.stall_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let log_level = if args.debug {
            "debug".to_string()
        } else {
            settings.log_level
        };

        Ok(Self {
            server_url,
            client: ClientSettings {
                client_name,
                client_version: CLIENT_VERSION.to_string(),
                transfers: TransferSettings {
                    write_queue_depth: settings.write_queue_depth,
                    stall_timeout,
                },
            },
            download_dir,
            auto_accept: args.accept || settings.auto_accept,
            downloads: args.downloads.clone(),
            list_only: args.list,
            log_level,
        })
    }
}

fn is_websocket_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["ws://", "wss://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}
