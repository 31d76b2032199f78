//! Command-line argument parsing

use std::path::PathBuf;

use clap::Parser;

/// Get default download directory help text for current platform
fn default_download_dir_help() -> String {
    #[cfg(target_os = "linux")]
    return "Directory downloads are saved to (default: ~/Downloads)".to_string();

    #[cfg(target_os = "macos")]
    return "Directory downloads are saved to (default: ~/Downloads)".to_string();

    #[cfg(target_os = "windows")]
    return "Directory downloads are saved to (default: %USERPROFILE%\\Downloads)".to_string();

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "Directory downloads are saved to (default: current directory)".to_string();
}

/// FileSender command-line client
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to connect to (ws:// or wss://)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Display name sent to the host
    #[arg(short, long)]
    pub name: Option<String>,

    /// Directory downloads are saved to
    #[arg(short = 'o', long = "download-dir", help = default_download_dir_help())]
    pub download_dir: Option<PathBuf>,

    /// Accept every file the host offers
    #[arg(short, long, default_value = "false")]
    pub accept: bool,

    /// Download a file by catalog id once logged in (repeatable)
    #[arg(short = 'd', long = "download", value_name = "ID")]
    pub downloads: Vec<i32>,

    /// Print the host's file list and exit
    #[arg(short, long, default_value = "false")]
    pub list: bool,

    /// Settings file (overrides platform default)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fail transfers that receive nothing for this many seconds
    #[arg(long, value_name = "SECS")]
    pub stall_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,
}
