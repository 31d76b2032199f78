//! Application-wide constants

use std::time::Duration;

/// Directory name under the platform config directory
pub const APP_DIR_NAME: &str = "filesender";

/// Settings file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Suffix for downloads that have not completed yet
pub const PART_SUFFIX: &str = ".part";

/// Default depth of each transfer's write queue
pub const DEFAULT_WRITE_QUEUE_DEPTH: usize = 64;

/// How often the delivery loop checks for stalled transfers
pub const STALL_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default display name sent to the host
pub const DEFAULT_CLIENT_NAME: &str = "filesender-cli";

/// Largest chunk count a single transfer may announce
pub const MAX_CHUNK_COUNT: u64 = 1 << 26;
