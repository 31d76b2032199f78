//! Network module constants

use std::time::Duration;

/// Connection timeout duration (30 seconds)
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Close code reported when the connection ended without a close frame
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code reported when a close frame carried no status
pub const NO_STATUS_CODE: u16 = 1005;
