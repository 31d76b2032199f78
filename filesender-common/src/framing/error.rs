//! Frame decoding errors

use thiserror::Error;

/// Errors produced while decoding a binary chunk frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer bytes than the fixed header requires
    ///
    /// This means the binary stream is corrupt, not that a chunk was lost.
    #[error("binary frame too short: {actual} bytes (need at least {required})")]
    TooShort { actual: usize, required: usize },
}
